//! Show aggregate: one page of merged results.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::broker::{ShowParams, SortSpec};
use crate::connection::Connection;
use crate::error::CurtainError;
use crate::model::ShowPage;

use super::{PollLimits, Poller};

/// Polls `show` until `activeclients == 0`.
#[derive(Debug)]
pub struct ShowPoller {
    poller: Poller,
    connection: Connection,
}

impl ShowPoller {
    pub fn new(connection: Connection, period: Duration, limits: PollLimits) -> Self {
        Self {
            poller: Poller::new("show", period, limits),
            connection,
        }
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Poll the 1-based `page` of `page_size` hits until no target is active.
    pub async fn poll(
        &self,
        session: &str,
        page: u32,
        page_size: u32,
        sort: SortSpec,
        cancel: &CancellationToken,
    ) -> Result<ShowPage, CurtainError> {
        let params = ShowParams::for_page(page, page_size, sort);
        self.poller
            .poll(
                cancel,
                || self.fetch(session, &params, page, page_size),
                ShowPage::is_converged,
                |_| {},
            )
            .await
    }

    pub fn end(&self) {
        self.poller.end();
    }

    async fn fetch(
        &self,
        session: &str,
        params: &ShowParams,
        page: u32,
        page_size: u32,
    ) -> Result<ShowPage, CurtainError> {
        let raw = self.connection.broker().poll_show(session, params).await?;
        let doc = self.connection.decode(&raw)?;
        ShowPage::from_document(&doc, page, page_size, Some(session))
    }
}
