//! Metasearch broker abstraction.
//!
//! This module provides a `Broker` trait for issuing the raw broker commands
//! (init, ping, search, stat, show, termlist, record) and a Pazpar2 HTTP
//! implementation. Responses are returned undecoded.

mod pazpar2;
mod types;

pub use pazpar2::Pazpar2Broker;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Raw response body as returned by the broker.
pub type RawResponse = Vec<u8>;

/// Errors raised when a broker call itself fails.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("broker connection failed: {0}")]
    ConnectionFailed(String),

    #[error("broker returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("broker request timeout")]
    Timeout,

    #[error("broker request failed: {0}")]
    Request(String),
}

/// Trait for metasearch broker transports.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Transport name for logging.
    fn name(&self) -> &str;

    /// Ask the broker for a new session.
    async fn create_session(&self) -> Result<RawResponse, TransportError>;

    /// Liveness probe for `session`.
    async fn ping(&self, session: &str) -> Result<RawResponse, TransportError>;

    /// Start a search for `query`, optionally restricted by `filter`.
    async fn start_search(
        &self,
        session: &str,
        query: &str,
        filter: Option<&str>,
    ) -> Result<RawResponse, TransportError>;

    /// Poll search progress.
    async fn poll_stat(&self, session: &str) -> Result<RawResponse, TransportError>;

    /// Poll one page of merged, ranked results.
    async fn poll_show(
        &self,
        session: &str,
        params: &ShowParams,
    ) -> Result<RawResponse, TransportError>;

    /// Poll the term lists for `facet_names`.
    async fn poll_termlist(
        &self,
        session: &str,
        facet_names: &[String],
    ) -> Result<RawResponse, TransportError>;

    /// Fetch a record, or the raw content of one of its holdings.
    async fn fetch_record(
        &self,
        session: &str,
        recid: &str,
        offset: Option<usize>,
    ) -> Result<RawResponse, TransportError>;
}
