//! Search orchestration: one query, three converging aggregates.

mod orchestrator;
mod request;

pub use orchestrator::SearchOrchestrator;
pub use request::{SearchRequest, SearchResults, DEFAULT_PAGE_SIZE};
