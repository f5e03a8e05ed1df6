use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{RemoteError, SearchOperation};
use crate::model::types::{Account, FileItem, MimeFilter, SearchRequest, SearchResult};

const MAX_ERROR_BODY: usize = 200;

/// Photo search over HTTP: POSTs a JSON query, reads back a JSON page of files.
///
/// Build it outside of any async context; the blocking client owns its own
/// runtime and panics when created or dropped inside one.
pub struct HttpSearchOperation {
    client: Client,
    search_path: String,
    filter: MimeFilter,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    before: Option<i64>,
    mime_types: &'a [String],
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<FileItem>,
}

impl HttpSearchOperation {
    pub fn new(
        search_path: impl Into<String>,
        filter: MimeFilter,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("photo-search/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            search_path: search_path.into(),
            filter,
        })
    }

    pub fn endpoint(&self, account: &Account) -> String {
        let base = account.server_url.trim_end_matches('/');
        let path = self.search_path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn fetch(&self, account: &Account, request: &SearchRequest) -> Result<Vec<FileItem>, RemoteError> {
        let body = SearchBody {
            limit: request.limit,
            before: request.cursor,
            mime_types: &self.filter.prefixes,
        };
        let resp = self
            .client
            .post(self.endpoint(account))
            .basic_auth(&account.user, account.password.as_deref())
            .json(&body)
            .send()?;

        let status = resp.status();
        let text = resp.text()?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let page: SearchResponse = serde_json::from_str(&text)?;
        Ok(page.items)
    }
}

impl SearchOperation for HttpSearchOperation {
    fn execute(&self, account: &Account, request: &SearchRequest) -> SearchResult {
        let _span = tracing::debug_span!("http_search", account = %account.name()).entered();
        match self.fetch(account, request) {
            Ok(items) => {
                tracing::debug!(count = items.len(), "http_search_ok");
                SearchResult::ok(items)
            }
            Err(err) => {
                tracing::warn!("photo search against {} failed: {err}", self.endpoint(account));
                SearchResult::failed(err)
            }
        }
    }
}
