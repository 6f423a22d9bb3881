//! Mock broker for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::broker::{Broker, RawResponse, ShowParams, TransportError};

use super::fixtures;

/// A recorded broker call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Command name (`init`, `ping`, `search`, `stat`, `show`, `termlist`, `record`).
    pub command: &'static str,
    pub session: Option<String>,
    /// Command-specific arguments, e.g. the query of a search.
    pub args: Vec<String>,
}

#[derive(Default)]
struct State {
    /// Scripted responses per command. The last one is repeated once the
    /// queue is down to a single entry.
    responses: HashMap<&'static str, VecDeque<RawResponse>>,
    /// Raw holding content by record offset.
    contents: HashMap<usize, RawResponse>,
    /// Transport failures to inject, per command.
    failures: HashMap<&'static str, VecDeque<TransportError>>,
    calls: Vec<RecordedCall>,
    show_params: Vec<ShowParams>,
    termlist_names: Vec<Vec<String>>,
    delays: HashMap<&'static str, Duration>,
}

/// Mock implementation of the Broker trait.
///
/// Provides controllable behavior for testing:
/// - Scripted response sequences per command
/// - Recorded calls for assertions
/// - Injected transport failures and per-command delays
///
/// Commands without a script answer like an idle Pazpar2: `init` hands out
/// `mock-session-N`, `stat`/`show`/`termlist` report a finished empty
/// search, and `record` reports a missing record.
///
/// Failures and delays for holding fetches (`record` with an offset) are
/// keyed by `"record-offset"`.
pub struct MockBroker {
    state: Mutex<State>,
    sessions: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl std::fmt::Debug for MockBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBroker")
            .field("calls", &self.state().calls.len())
            .finish()
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBroker {
    /// Create a mock broker with no scripted responses.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            sessions: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a response for `command`.
    pub fn push(&self, command: &'static str, response: impl Into<Vec<u8>>) {
        self.state()
            .responses
            .entry(command)
            .or_default()
            .push_back(response.into());
    }

    pub fn push_init(&self, response: impl Into<Vec<u8>>) {
        self.push("init", response);
    }

    pub fn push_ping(&self, response: impl Into<Vec<u8>>) {
        self.push("ping", response);
    }

    pub fn push_search(&self, response: impl Into<Vec<u8>>) {
        self.push("search", response);
    }

    pub fn push_stat(&self, response: impl Into<Vec<u8>>) {
        self.push("stat", response);
    }

    pub fn push_show(&self, response: impl Into<Vec<u8>>) {
        self.push("show", response);
    }

    pub fn push_termlist(&self, response: impl Into<Vec<u8>>) {
        self.push("termlist", response);
    }

    /// Queue a plain record (no offset) response.
    pub fn push_record(&self, response: impl Into<Vec<u8>>) {
        self.push("record", response);
    }

    /// Set the raw content returned for `record` at `offset`.
    pub fn set_record_content(&self, offset: usize, content: impl Into<Vec<u8>>) {
        self.state().contents.insert(offset, content.into());
    }

    /// Make the next call to `command` fail with `error`.
    pub fn fail_next(&self, command: &'static str, error: TransportError) {
        self.state()
            .failures
            .entry(command)
            .or_default()
            .push_back(error);
    }

    /// Delay every call to `command` by `delay`.
    pub fn set_delay(&self, command: &'static str, delay: Duration) {
        self.state().delays.insert(command, delay);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Number of calls made to `command`.
    pub fn calls_to(&self, command: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.command == command)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.len()
    }

    /// Parameters of every show call.
    pub fn show_params(&self) -> Vec<ShowParams> {
        self.state().show_params.clone()
    }

    /// Facet names of every termlist call.
    pub fn termlist_names(&self) -> Vec<Vec<String>> {
        self.state().termlist_names.clone()
    }

    /// Offsets of every record call (`None` for the plain record).
    pub fn record_offsets(&self) -> Vec<Option<usize>> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.command == "record")
            .map(|c| c.args.get(1).and_then(|o| o.parse().ok()))
            .collect()
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, command: &'static str, session: Option<&str>, args: Vec<String>) {
        self.state().calls.push(RecordedCall {
            command,
            session: session.map(str::to_string),
            args,
        });
    }

    /// Take the scripted answer for `command`, honouring failures and delays.
    async fn respond(
        &self,
        command: &'static str,
        fallback: impl FnOnce() -> RawResponse,
    ) -> Result<RawResponse, TransportError> {
        let delay = self.state().delays.get(command).copied();

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut state = self.state();
        if let Some(error) = state.failures.get_mut(command).and_then(VecDeque::pop_front) {
            return Err(error);
        }

        let response = match state.responses.get_mut(command) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(fallback))
    }
}

#[async_trait]
impl Broker for MockBroker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_session(&self) -> Result<RawResponse, TransportError> {
        self.record("init", None, vec![]);
        self.respond("init", || {
            let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
            fixtures::init_xml(&format!("mock-session-{}", n)).into_bytes()
        })
        .await
    }

    async fn ping(&self, session: &str) -> Result<RawResponse, TransportError> {
        self.record("ping", Some(session), vec![]);
        self.respond("ping", || fixtures::ok_xml("ping").into_bytes())
            .await
    }

    async fn start_search(
        &self,
        session: &str,
        query: &str,
        filter: Option<&str>,
    ) -> Result<RawResponse, TransportError> {
        let mut args = vec![query.to_string()];
        args.extend(filter.map(str::to_string));
        self.record("search", Some(session), args);
        self.respond("search", || fixtures::ok_xml("search").into_bytes())
            .await
    }

    async fn poll_stat(&self, session: &str) -> Result<RawResponse, TransportError> {
        self.record("stat", Some(session), vec![]);
        self.respond("stat", || fixtures::stat_xml(0, 1.0, 0).into_bytes())
            .await
    }

    async fn poll_show(
        &self,
        session: &str,
        params: &ShowParams,
    ) -> Result<RawResponse, TransportError> {
        self.record("show", Some(session), vec![]);
        self.state().show_params.push(params.clone());
        self.respond("show", || fixtures::show_xml(0, 0, &[]).into_bytes())
            .await
    }

    async fn poll_termlist(
        &self,
        session: &str,
        facet_names: &[String],
    ) -> Result<RawResponse, TransportError> {
        self.record("termlist", Some(session), facet_names.to_vec());
        self.state().termlist_names.push(facet_names.to_vec());
        self.respond("termlist", || fixtures::termlist_xml(0, &[]).into_bytes())
            .await
    }

    async fn fetch_record(
        &self,
        session: &str,
        recid: &str,
        offset: Option<usize>,
    ) -> Result<RawResponse, TransportError> {
        let mut args = vec![recid.to_string()];
        args.extend(offset.map(|o| o.to_string()));
        self.record("record", Some(session), args);

        match offset {
            None => {
                self.respond("record", || {
                    fixtures::error_xml(7, "Record missing").into_bytes()
                })
                .await
            }
            Some(offset) => {
                let content = self.state().contents.get(&offset).cloned();
                self.respond("record-offset", || {
                    content.unwrap_or_else(|| {
                        fixtures::error_xml(10, "Invalid record offset").into_bytes()
                    })
                })
                .await
            }
        }
    }
}
