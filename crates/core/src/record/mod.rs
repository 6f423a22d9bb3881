//! Full record assembly: metadata plus the content of every holding.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker::RawResponse;
use crate::connection::Connection;
use crate::error::{CurtainError, MISSING_RECORD};
use crate::model::{broker_error, Record};
use crate::search::SearchOrchestrator;

/// Result of a single `record` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecordFetch {
    /// The merged record, without holding content.
    Document(Record),
    /// Undecoded content of one holding.
    Raw(Vec<u8>),
}

/// Fetches records, searching for them first to learn whether they exist.
#[derive(Debug)]
pub struct RecordAssembler {
    connection: Connection,
    orchestrator: Arc<SearchOrchestrator>,
}

impl RecordAssembler {
    /// The assembler shares the searching flag and stat poller of `orchestrator`.
    pub fn new(connection: Connection, orchestrator: Arc<SearchOrchestrator>) -> Self {
        Self {
            connection,
            orchestrator,
        }
    }

    /// Fetch record `id` with the content of all its holdings attached.
    ///
    /// Fails with [`MISSING_RECORD`] when a `recid=` search finds nothing,
    /// without fetching the record itself.
    pub async fn get_record(
        &self,
        session: &str,
        id: &str,
        filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Record, CurtainError> {
        let _guard = self.orchestrator.claim()?;
        if id.trim().is_empty() {
            return Err(CurtainError::InvalidRequest("record id is empty".to_string()));
        }

        let query = format!("recid={}", id);
        self.orchestrator.start(session, &query, filter, cancel).await?;
        let stat = self.orchestrator.await_stat(session, cancel).await?;

        if stat.hits == 0 {
            warn!(session = %session, recid = %id, "record not found");
            return Err(CurtainError::broker(
                MISSING_RECORD,
                format!("no record with id {}", id),
                Some(session),
            ));
        }

        let mut record = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CurtainError::Cancelled),
            record = self.fetch_document(session, id) => record?,
        };
        let fetches = (0..record.holdings.len()).map(|offset| self.fetch_raw(session, id, offset));

        let contents = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CurtainError::Cancelled),
            contents = try_join_all(fetches) => contents?,
        };

        for (holding, content) in record.holdings.iter_mut().zip(contents) {
            holding.content = Some(content);
        }

        info!(
            session = %session,
            recid = %id,
            holdings = record.holdings.len(),
            "record assembled"
        );
        Ok(record)
    }

    /// Run one `record` command: the decoded record without `offset`, the
    /// raw holding content with it.
    pub async fn record(
        &self,
        session: &str,
        id: &str,
        offset: Option<usize>,
    ) -> Result<RecordFetch, CurtainError> {
        match offset {
            None => self.fetch_document(session, id).await.map(RecordFetch::Document),
            Some(offset) => self.fetch_raw(session, id, offset).await.map(RecordFetch::Raw),
        }
    }

    async fn fetch_document(&self, session: &str, id: &str) -> Result<Record, CurtainError> {
        let raw = self
            .connection
            .broker()
            .fetch_record(session, id, None)
            .await?;
        let doc = self.connection.decode(&raw)?;
        Record::from_document(&doc, Some(session))
    }

    async fn fetch_raw(
        &self,
        session: &str,
        id: &str,
        offset: usize,
    ) -> Result<RawResponse, CurtainError> {
        debug!(session = %session, recid = %id, offset = offset, "fetching holding content");
        let raw = self
            .connection
            .broker()
            .fetch_record(session, id, Some(offset))
            .await?;

        if is_error_envelope(&raw) {
            let doc = self.connection.decode(&raw)?;
            return Err(broker_error(doc.root(), Some(session)));
        }
        Ok(raw)
    }
}

/// Whether a raw payload is a broker `<error>` document.
fn is_error_envelope(raw: &[u8]) -> bool {
    let mut rest = raw.trim_ascii_start();
    if rest.starts_with(b"<?xml") {
        match rest.windows(2).position(|w| w == b"?>") {
            Some(end) => rest = rest[end + 2..].trim_ascii_start(),
            None => return false,
        }
    }
    rest.strip_prefix(b"<error")
        .and_then(|after| after.first())
        .is_some_and(|next| matches!(next, b' ' | b'>' | b'/' | b'\t' | b'\r' | b'\n'))
}
