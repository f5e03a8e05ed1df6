//! Remote search operation seam.
//!
//! The search task only knows [`SearchOperation`]; the HTTP client in
//! [`http`] is the production implementation and tests substitute their own.

pub mod http;

use thiserror::Error;

use crate::model::types::{Account, SearchRequest, SearchResult};

pub use http::HttpSearchOperation;

/// Why a remote search failed.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode search response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// A blocking, bounded search against the remote listing.
///
/// Implementations block the calling thread for the whole round trip, so
/// callers must keep them off the UI thread.
pub trait SearchOperation: Send + Sync {
    fn execute(&self, account: &Account, request: &SearchRequest) -> SearchResult;
}
