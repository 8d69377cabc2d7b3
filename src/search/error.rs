//! Errors surfaced by the search orchestrator

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("chatInput must be a non-empty string")]
    EmptyQuery,
    #[error("could not determine {0} from the query")]
    Unparseable(&'static str),
    #[error("internal search error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SearchError {
    /// True for errors caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::EmptyQuery | SearchError::Unparseable(_))
    }
}
