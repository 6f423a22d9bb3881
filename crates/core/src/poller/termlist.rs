//! Termlist aggregate: facet breakdowns of the result set.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::connection::Connection;
use crate::error::CurtainError;
use crate::model::TermListFacet;

use super::{PollLimits, Poller};

/// Polls `termlist` until `activeclients == 0`.
#[derive(Debug)]
pub struct TermlistPoller {
    poller: Poller,
    connection: Connection,
}

impl TermlistPoller {
    pub fn new(connection: Connection, period: Duration, limits: PollLimits) -> Self {
        Self {
            poller: Poller::new("termlist", period, limits),
            connection,
        }
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Poll the facets in `facet_names`. An empty list resolves at once to
    /// an empty mapping without contacting the broker.
    pub async fn poll(
        &self,
        session: &str,
        facet_names: &[String],
        cancel: &CancellationToken,
    ) -> Result<TermListFacet, CurtainError> {
        if facet_names.is_empty() {
            trace!("no facets requested");
            return Ok(TermListFacet::empty());
        }

        let (facets, _) = self
            .poller
            .poll(
                cancel,
                || self.fetch(session, facet_names),
                |(_, activeclients)| *activeclients == 0,
                |_| {},
            )
            .await?;
        Ok(facets)
    }

    pub fn end(&self) {
        self.poller.end();
    }

    async fn fetch(
        &self,
        session: &str,
        facet_names: &[String],
    ) -> Result<(TermListFacet, u32), CurtainError> {
        let raw = self
            .connection
            .broker()
            .poll_termlist(session, facet_names)
            .await?;
        let doc = self.connection.decode(&raw)?;
        TermListFacet::from_document(&doc, Some(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::decoder::XmlDecoder;
    use crate::poller::PollerState;
    use crate::testing::{fixtures, MockBroker};

    fn termlist_poller(broker: &Arc<MockBroker>) -> TermlistPoller {
        let connection = Connection::new(broker.clone(), Arc::new(XmlDecoder::new()));
        TermlistPoller::new(connection, Duration::from_millis(5), PollLimits::max_ticks(20))
    }

    #[tokio::test]
    async fn test_no_facets_makes_no_calls() {
        let broker = Arc::new(MockBroker::new());
        let poller = termlist_poller(&broker);

        let facets = poller
            .poll("s1", &[], &CancellationToken::new())
            .await
            .unwrap();

        assert!(facets.is_empty());
        assert_eq!(broker.total_calls(), 0);
        assert_eq!(poller.poller().state(), PollerState::Idle);
    }

    #[tokio::test]
    async fn test_polls_until_inactive() {
        let broker = Arc::new(MockBroker::new());
        broker.push_termlist(fixtures::termlist_xml(1, &[("author", &[("Shaw", 2)])]));
        broker.push_termlist(fixtures::termlist_xml(
            0,
            &[("author", &[("Shaw", 5), ("Twain", 1)]), ("subject", &[("Drama", 4)])],
        ));

        let names = vec!["author".to_string(), "subject".to_string()];
        let facets = termlist_poller(&broker)
            .poll("s1", &names, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(facets.len(), 2);
        assert_eq!(facets.get("author").unwrap().terms[0].frequency, 5);
        assert_eq!(facets.get("subject").unwrap().terms[0].name, "Drama");
        assert_eq!(broker.calls_to("termlist"), 2);
        assert_eq!(broker.termlist_names(), vec![names.clone(), names]);
    }
}
