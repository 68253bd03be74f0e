//! Caterer keyword search boundary.

use async_trait::async_trait;

use ezcaters_core::error::{AgentError, Result};
use ezcaters_core::types::{Caterer, SearchRequest, SearchType};

pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a search term";
pub const SEARCH_FAILED_MESSAGE: &str = "Failed to search catering services. Please try again.";

/// Remote caterer directory.
#[async_trait]
pub trait CatererSearch: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<Caterer>>;
}

/// Build a search request, rejecting blank queries.
pub fn build_request(kind: SearchType, query: &str) -> Result<SearchRequest> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AgentError::EmptyInput);
    }
    Ok(SearchRequest {
        kind,
        query: query.to_string(),
    })
}
