use serde::{Deserialize, Serialize};
use std::fmt;

use crate::remote::RemoteError;

/// A remote file as returned by a search and shown in the photo list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    pub remote_path: String,
    #[serde(default)]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    /// Last modification, milliseconds since the unix epoch.
    pub modified_ms: i64,
    #[serde(default)]
    pub etag: Option<String>,
}

impl FileItem {
    pub fn new(remote_path: impl Into<String>, mime_type: impl Into<String>, modified_ms: i64) -> Self {
        Self {
            remote_path: remote_path.into(),
            remote_id: None,
            mime_type: mime_type.into(),
            size: 0,
            modified_ms,
            etag: None,
        }
    }

    pub fn file_name(&self) -> &str {
        self.remote_path
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(&self.remote_path)
    }
}

/// Which listing a file list is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    NoSearch,
    FileSearch,
    FavoriteSearch,
    RecentlyModifiedSearch,
    SharedFilter,
    PhotoSearch,
}

/// Headline and body shown when a list has nothing to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyMessage {
    pub headline: &'static str,
    pub message: &'static str,
}

impl SearchType {
    pub fn empty_message(self) -> EmptyMessage {
        let (headline, message) = match self {
            Self::NoSearch => ("No files here", "Upload some content or sync with your devices."),
            Self::FileSearch => ("No results", "Try a different search term."),
            Self::FavoriteSearch => ("Nothing favorited yet", "Files and folders you mark as favorites will show up here."),
            Self::RecentlyModifiedSearch => ("No modified files", "No files have been modified in the last 7 days."),
            Self::SharedFilter => ("Nothing shared yet", "Files and folders you share will show up here."),
            Self::PhotoSearch => ("No photos or videos", "Photos and videos you upload will show up here."),
        };
        EmptyMessage { headline, message }
    }

    pub fn is_photo_search(self) -> bool {
        matches!(self, Self::PhotoSearch)
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoSearch => "no_search",
            Self::FileSearch => "file_search",
            Self::FavoriteSearch => "favorite_search",
            Self::RecentlyModifiedSearch => "recently_modified_search",
            Self::SharedFilter => "shared_filter",
            Self::PhotoSearch => "photo_search",
        };
        f.write_str(s)
    }
}

/// Credentials for the remote server. The password never shows up in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub server_url: String,
    pub user: String,
    pub password: Option<String>,
}

impl Account {
    pub fn new(server_url: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            user: user.into(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// `user@host`, used to key the file cache and in logs.
    pub fn name(&self) -> String {
        let host = self
            .server_url
            .split("://")
            .nth(1)
            .unwrap_or(&self.server_url)
            .trim_end_matches('/');
        format!("{}@{}", self.user, host)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("server_url", &self.server_url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// One page request: how many items and where to continue from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRequest {
    pub limit: usize,
    /// Only files modified strictly before this unix time (seconds). `None` starts at the newest.
    pub cursor: Option<i64>,
}

impl SearchRequest {
    /// Returns `None` for a zero limit.
    pub fn new(limit: usize, cursor: Option<i64>) -> Option<Self> {
        (limit > 0).then_some(Self { limit, cursor })
    }

    /// Builds a request from a raw watermark; anything `<= 0` means "from the start".
    pub fn from_watermark(limit: usize, last_timestamp: i64) -> Option<Self> {
        Self::new(limit, (last_timestamp > 0).then_some(last_timestamp))
    }
}

/// Outcome of one remote search, and of one search task.
#[derive(Debug, Default)]
pub struct SearchResult {
    pub success: bool,
    pub items: Vec<FileItem>,
    pub error: Option<RemoteError>,
}

impl SearchResult {
    pub fn ok(items: Vec<FileItem>) -> Self {
        Self {
            success: true,
            items,
            error: None,
        }
    }

    pub fn failed(error: RemoteError) -> Self {
        Self {
            success: false,
            items: Vec::new(),
            error: Some(error),
        }
    }

    /// Failure without a cause: sink gone or task cancelled.
    pub fn aborted() -> Self {
        Self::default()
    }
}

/// Keeps only files whose mime type starts with one of the prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MimeFilter {
    pub prefixes: Vec<String>,
}

impl MimeFilter {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn photos_and_videos() -> Self {
        Self::new(["image/", "video/"])
    }

    pub fn matches(&self, item: &FileItem) -> bool {
        self.prefixes.is_empty()
            || self
                .prefixes
                .iter()
                .any(|p| item.mime_type.starts_with(p.as_str()))
    }
}
