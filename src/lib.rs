// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod ai;
pub mod api;
pub mod candidate;
pub mod classifier;
pub mod config;
pub mod jobs;
pub mod metrics;
pub mod query;
pub mod rerank;
pub mod search;

// ---- Re-exports for stable public API ----
// Router construction: `career_scout::api::create_router` or `career_scout::create_router`.
pub use crate::api::{create_router, create_router_with, AppState};
// Core domain types used by callers and tests.
pub use crate::candidate::{
    CareerCandidate, CompanySize, DiscoveryCriteria, JobListing, SearchHit,
};
