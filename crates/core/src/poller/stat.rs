//! Stat aggregate: search progress until every target is done.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::connection::Connection;
use crate::error::CurtainError;
use crate::model::StatSnapshot;

use super::{PollLimits, Poller};

/// Receives every stat snapshot observed while a search runs.
pub type ProgressCallback = Arc<dyn Fn(&StatSnapshot) + Send + Sync>;

/// Polls `stat` until `working == 0`.
#[derive(Debug)]
pub struct StatPoller {
    poller: Poller,
    connection: Connection,
}

impl StatPoller {
    pub fn new(connection: Connection, period: Duration, limits: PollLimits) -> Self {
        Self {
            poller: Poller::new("stat", period, limits),
            connection,
        }
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Poll until converged, reporting each snapshot to `progress`.
    pub async fn poll(
        &self,
        session: &str,
        progress: Option<&ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<StatSnapshot, CurtainError> {
        self.poller
            .poll(
                cancel,
                || self.fetch(session),
                StatSnapshot::is_converged,
                |stat| {
                    if let Some(progress) = progress {
                        progress(stat);
                    }
                },
            )
            .await
    }

    pub fn end(&self) {
        self.poller.end();
    }

    async fn fetch(&self, session: &str) -> Result<StatSnapshot, CurtainError> {
        let raw = self.connection.broker().poll_stat(session).await?;
        let doc = self.connection.decode(&raw)?;
        StatSnapshot::from_document(&doc, Some(session))
    }
}
