// src/search/types.rs
use anyhow::Result;

use crate::candidate::{JobListing, SearchHit};

/// Search-service boundary. Implementations apply their own timeouts and at
/// most one rate-limit backoff per call; malformed payloads surface as
/// errors, never panics.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Organic web search (engine selector `google`).
    async fn organic(&self, query: &str) -> Result<Vec<SearchHit>>;
    /// Job-listing search (engine selector `google_jobs`).
    async fn jobs(&self, query: &str, location: &str) -> Result<Vec<JobListing>>;
    fn name(&self) -> &'static str;
}
