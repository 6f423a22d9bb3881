//! Drives one search through the three aggregate pollers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::connection::Connection;
use crate::error::CurtainError;
use crate::model::{expect_ok, StatSnapshot};
use crate::poller::{PollLimits, ProgressCallback, ShowPoller, StatPoller, TermlistPoller};

use super::{SearchRequest, SearchResults};

/// Marks the orchestrator as searching until dropped.
#[derive(Debug)]
pub(crate) struct SearchGuard<'a> {
    searching: &'a AtomicBool,
}

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        self.searching.store(false, Ordering::Release);
    }
}

/// Runs searches one at a time against a shared connection.
#[derive(Debug)]
pub struct SearchOrchestrator {
    connection: Connection,
    searching: AtomicBool,
    stat: StatPoller,
    show: ShowPoller,
    termlist: TermlistPoller,
}

impl SearchOrchestrator {
    pub fn new(connection: Connection, polling: &PollingConfig) -> Self {
        let limits = PollLimits::from(polling);
        Self {
            stat: StatPoller::new(connection.clone(), polling.stat_interval(), limits),
            show: ShowPoller::new(connection.clone(), polling.show_interval(), limits),
            termlist: TermlistPoller::new(connection.clone(), polling.termlist_interval(), limits),
            searching: AtomicBool::new(false),
            connection,
        }
    }

    pub fn is_searching(&self) -> bool {
        self.searching.load(Ordering::Acquire)
    }

    pub fn stat_poller(&self) -> &StatPoller {
        &self.stat
    }

    pub fn show_poller(&self) -> &ShowPoller {
        &self.show
    }

    pub fn termlist_poller(&self) -> &TermlistPoller {
        &self.termlist
    }

    /// Claim the searching flag, or fail if a search is already running.
    pub(crate) fn claim(&self) -> Result<SearchGuard<'_>, CurtainError> {
        self.searching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                warn!("search rejected, another one is still in flight");
                CurtainError::SearchInProgress
            })?;
        Ok(SearchGuard {
            searching: &self.searching,
        })
    }

    /// Run `request` to convergence and join the three aggregates.
    ///
    /// The request is rejected before anything reaches the broker while
    /// another search runs. If any poller fails the others are ended and
    /// that first error is returned.
    pub async fn search(
        &self,
        session: &str,
        request: &SearchRequest,
        facet_names: &[String],
        progress: Option<&ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<SearchResults, CurtainError> {
        let _guard = self.claim()?;
        request.validate()?;

        let started = Instant::now();
        info!(session = %session, query = %request.query, "search started");
        self.start(session, &request.query, request.filter.as_deref(), cancel)
            .await?;

        let joined = tokio::try_join!(
            self.stat.poll(session, progress, cancel),
            self.show.poll(
                session,
                request.page,
                request.page_size,
                request.sort.clone(),
                cancel
            ),
            self.termlist.poll(session, facet_names, cancel),
        );

        match joined {
            Ok((stat, mut show, termlist)) => {
                show.elapsed_secs = started.elapsed().as_secs_f64();
                info!(
                    session = %session,
                    hits = stat.hits,
                    total = show.total,
                    elapsed_secs = show.elapsed_secs,
                    "search finished"
                );
                Ok(SearchResults {
                    show,
                    termlist,
                    stat,
                })
            }
            Err(e) => {
                self.end_running();
                warn!(session = %session, error = %e, "search failed");
                Err(e)
            }
        }
    }

    /// Issue the broker's `search` command and check its acknowledgement.
    pub(crate) async fn start(
        &self,
        session: &str,
        query: &str,
        filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), CurtainError> {
        debug!(session = %session, query = %query, filter = ?filter, "starting broker search");
        let raw = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CurtainError::Cancelled),
            raw = self.connection.broker().start_search(session, query, filter) => raw?,
        };
        let doc = self.connection.decode(&raw)?;
        expect_ok(&doc, "search", Some(session))
    }

    /// Poll only the stat aggregate until every target is done.
    pub(crate) async fn await_stat(
        &self,
        session: &str,
        cancel: &CancellationToken,
    ) -> Result<StatSnapshot, CurtainError> {
        self.stat.poll(session, None, cancel).await
    }

    /// End all three pollers. Safe to call at any time, and the pollers can
    /// be started again afterwards.
    pub fn stop(&self) {
        self.stat.end();
        self.show.end();
        self.termlist.end();
    }

    /// End the pollers still polling, leaving a failed one observable.
    fn end_running(&self) {
        for poller in [self.stat.poller(), self.show.poller(), self.termlist.poller()] {
            if poller.is_polling() {
                poller.end();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::broker::TransportError;
    use crate::decoder::XmlDecoder;
    use crate::poller::PollerState;
    use crate::testing::{fixtures, MockBroker};

    fn polling() -> PollingConfig {
        PollingConfig {
            stat_interval_ms: 5,
            show_interval_ms: 5,
            termlist_interval_ms: 5,
            max_ticks: 50,
            timeout_secs: 5,
        }
    }

    fn orchestrator(broker: &Arc<MockBroker>) -> SearchOrchestrator {
        let connection = Connection::new(broker.clone(), Arc::new(XmlDecoder::new()));
        SearchOrchestrator::new(connection, &polling())
    }

    fn facets(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_search_joins_all_aggregates() {
        let broker = Arc::new(MockBroker::new());
        broker.push_stat(fixtures::stat_xml(1, 0.5, 4));
        broker.push_stat(fixtures::stat_xml(0, 1.0, 45));
        broker.push_show(fixtures::show_xml(1, 2, &["r1"]));
        broker.push_show(fixtures::show_xml(0, 45, &["r1", "r2"]));
        broker.push_termlist(fixtures::termlist_xml(0, &[("author", &[("Shaw", 12)])]));

        let orchestrator = orchestrator(&broker);
        let request = SearchRequest::new("ti=saint joan").with_page(2, 10);
        let results = orchestrator
            .search(
                "s1",
                &request,
                &facets(&["author"]),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(results.stat.hits, 45);
        assert_eq!(results.show.total, 45);
        assert_eq!(results.show.page_count, 5);
        assert_eq!(results.show.hits.len(), 2);
        assert!(results.show.elapsed_secs > 0.0);
        assert_eq!(results.termlist.get("author").unwrap().terms[0].frequency, 12);

        let search = &broker.calls()[0];
        assert_eq!(search.command, "search");
        assert_eq!(search.args, vec!["ti=saint joan".to_string()]);
        assert_eq!(broker.show_params()[0].start, 10);
        assert!(!orchestrator.is_searching());
    }

    #[tokio::test]
    async fn test_progress_streams_during_search() {
        let broker = Arc::new(MockBroker::new());
        broker.push_stat(fixtures::stat_xml(2, 0.3, 1));
        broker.push_stat(fixtures::stat_xml(1, 0.8, 2));
        broker.push_stat(fixtures::stat_xml(0, 1.0, 3));

        let seen: Arc<Mutex<Vec<f64>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let progress: ProgressCallback = Arc::new(move |stat: &StatSnapshot| {
            sink.lock().unwrap().push(stat.progress);
        });

        orchestrator(&broker)
            .search(
                "s1",
                &SearchRequest::new("shaw"),
                &[],
                Some(&progress),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![0.3, 0.8, 1.0]);
        assert_eq!(broker.calls_to("termlist"), 0);
    }

    #[tokio::test]
    async fn test_second_search_rejected_without_broker_call() {
        let broker = Arc::new(MockBroker::new());
        let orchestrator = orchestrator(&broker);

        let guard = orchestrator.claim().unwrap();
        let err = orchestrator
            .search(
                "s1",
                &SearchRequest::new("shaw"),
                &[],
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CurtainError::SearchInProgress));
        assert_eq!(broker.total_calls(), 0);

        drop(guard);
        assert!(!orchestrator.is_searching());
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_call() {
        let broker = Arc::new(MockBroker::new());
        let orchestrator = orchestrator(&broker);

        let err = orchestrator
            .search(
                "s1",
                &SearchRequest::new("shaw").with_page(0, 10),
                &[],
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CurtainError::InvalidRequest(_)));
        assert_eq!(broker.total_calls(), 0);
        assert!(!orchestrator.is_searching());
    }

    #[tokio::test]
    async fn test_rejected_start_fails_search() {
        let broker = Arc::new(MockBroker::new());
        broker.push_search(fixtures::error_xml(1, "Session does not exist or it has expired"));
        let orchestrator = orchestrator(&broker);

        let err = orchestrator
            .search(
                "s1",
                &SearchRequest::new("shaw"),
                &[],
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(err.is_invalid_session());
        assert_eq!(broker.calls_to("stat"), 0);
        assert!(!orchestrator.is_searching());
    }

    #[tokio::test]
    async fn test_failure_ends_siblings() {
        let broker = Arc::new(MockBroker::new());
        broker.push_stat(fixtures::stat_xml(3, 0.1, 0));
        broker.push_show(fixtures::show_xml(3, 0, &[]));
        broker.push_termlist(fixtures::termlist_xml(3, &[]));
        broker.fail_next("stat", TransportError::ConnectionFailed("refused".to_string()));

        let orchestrator = orchestrator(&broker);
        let err = orchestrator
            .search(
                "s1",
                &SearchRequest::new("shaw"),
                &facets(&["subject"]),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CurtainError::Transport(_)));
        assert_eq!(orchestrator.stat_poller().poller().state(), PollerState::Failed);
        assert_eq!(orchestrator.show_poller().poller().state(), PollerState::Idle);
        assert_eq!(orchestrator.termlist_poller().poller().state(), PollerState::Idle);
        assert!(!orchestrator.is_searching());

        let calls = broker.total_calls();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(broker.total_calls(), calls);
    }

    #[tokio::test]
    async fn test_stop_aborts_search_and_allows_restart() {
        let broker = Arc::new(MockBroker::new());
        broker.push_stat(fixtures::stat_xml(1, 0.5, 1));
        let orchestrator = orchestrator(&broker);

        let request = SearchRequest::new("shaw");
        let never_cancelled = CancellationToken::new();
        let (result, _) = tokio::join!(
            orchestrator.search(
                "s1",
                &request,
                &[],
                None,
                &never_cancelled,
            ),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                orchestrator.stop();
            }
        );
        assert!(matches!(result, Err(CurtainError::Cancelled)));

        orchestrator.stop();
        let stat_calls = broker.calls_to("stat");
        broker.push_stat(fixtures::stat_xml(1, 0.7, 1));
        broker.push_stat(fixtures::stat_xml(0, 1.0, 1));

        let results = orchestrator
            .search(
                "s1",
                &SearchRequest::new("shaw"),
                &[],
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(results.stat.working, 0);
        assert!(broker.calls_to("stat") >= stat_calls + 2);
        assert_eq!(orchestrator.stat_poller().poller().state(), PollerState::Converged);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_stalled_start() {
        let broker = Arc::new(MockBroker::new());
        broker.set_delay("search", Duration::from_secs(2));
        let orchestrator = orchestrator(&broker);
        let cancel = CancellationToken::new();
        let started = std::time::Instant::now();

        let request = SearchRequest::new("shaw");
        let (result, _) = tokio::join!(
            orchestrator.search("s1", &request, &[], None, &cancel),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                cancel.cancel();
            }
        );

        assert!(matches!(result, Err(CurtainError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(broker.calls_to("stat"), 0);
        assert!(!orchestrator.is_searching());
    }
}
