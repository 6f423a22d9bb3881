//! The `Curtain` facade: one session, one search at a time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::broker::{Broker, Pazpar2Broker};
use crate::config::{BrokerConfig, Config, PollingConfig};
use crate::connection::Connection;
use crate::decoder::{Decoder, XmlDecoder};
use crate::error::CurtainError;
use crate::model::Record;
use crate::poller::ProgressCallback;
use crate::record::{RecordAssembler, RecordFetch};
use crate::search::{SearchOrchestrator, SearchRequest, SearchResults};
use crate::session::{InitOptions, SessionManager};

/// Construction options for [`Curtain`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurtainOptions {
    pub broker: BrokerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    /// Session to start from, validated on `init({ safe: true })`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl CurtainOptions {
    pub fn new(broker: BrokerConfig) -> Self {
        Self {
            broker,
            polling: PollingConfig::default(),
            session: None,
        }
    }
}

impl From<&Config> for CurtainOptions {
    fn from(config: &Config) -> Self {
        Self {
            broker: config.broker.clone(),
            polling: config.polling.clone(),
            session: config.session.id.clone(),
        }
    }
}

/// Client for a Pazpar2 broker.
///
/// All components share one broker/decoder pair. `search` and `get_record`
/// share a single in-flight flag, so a second call while one runs fails
/// with [`CurtainError::SearchInProgress`].
#[derive(Debug)]
pub struct Curtain {
    sessions: SessionManager,
    orchestrator: Arc<SearchOrchestrator>,
    records: RecordAssembler,
}

impl Curtain {
    /// Connect to the broker over HTTP.
    pub fn new(options: CurtainOptions) -> Result<Self, CurtainError> {
        let broker = Pazpar2Broker::new(options.broker.clone())?;
        Ok(Self::with_collaborators(
            options,
            Arc::new(broker),
            Arc::new(XmlDecoder::new()),
        ))
    }

    pub fn from_config(config: &Config) -> Result<Self, CurtainError> {
        Self::new(CurtainOptions::from(config))
    }

    /// Build on a caller-supplied transport and decoder.
    pub fn with_collaborators(
        options: CurtainOptions,
        broker: Arc<dyn Broker>,
        decoder: Arc<dyn Decoder>,
    ) -> Self {
        let connection = Connection::new(broker, decoder);
        let orchestrator = Arc::new(SearchOrchestrator::new(
            connection.clone(),
            &options.polling,
        ));

        Self {
            sessions: SessionManager::with_session(connection.clone(), options.session),
            records: RecordAssembler::new(connection, Arc::clone(&orchestrator)),
            orchestrator,
        }
    }

    /// Create or validate the session. Returns the live token.
    pub async fn init(&self, options: InitOptions) -> Result<String, CurtainError> {
        self.sessions.init(options).await
    }

    pub async fn ping(&self) -> Result<(), CurtainError> {
        self.sessions.ping().await
    }

    pub async fn is_session_valid(&self) -> bool {
        self.sessions.is_session_valid().await
    }

    /// The live session token, if `init` has succeeded.
    pub fn session(&self) -> Option<String> {
        self.sessions.current().ok()
    }

    pub fn is_searching(&self) -> bool {
        self.orchestrator.is_searching()
    }

    /// Run a search and wait for all three aggregates to converge.
    pub async fn search(
        &self,
        request: &SearchRequest,
        facet_names: &[String],
        progress: Option<ProgressCallback>,
    ) -> Result<SearchResults, CurtainError> {
        self.search_with_cancel(request, facet_names, progress, &CancellationToken::new())
            .await
    }

    /// Like [`Curtain::search`], aborted with `Cancelled` once `cancel` fires.
    pub async fn search_with_cancel(
        &self,
        request: &SearchRequest,
        facet_names: &[String],
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<SearchResults, CurtainError> {
        let session = self.sessions.current()?;
        self.orchestrator
            .search(&session, request, facet_names, progress.as_ref(), cancel)
            .await
    }

    /// Fetch a record with the content of every holding attached.
    pub async fn get_record(&self, id: &str, filter: Option<&str>) -> Result<Record, CurtainError> {
        self.get_record_with_cancel(id, filter, &CancellationToken::new())
            .await
    }

    pub async fn get_record_with_cancel(
        &self,
        id: &str,
        filter: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Record, CurtainError> {
        let session = self.sessions.current()?;
        self.records.get_record(&session, id, filter, cancel).await
    }

    /// Single `record` command: decoded without `offset`, raw with it.
    pub async fn record(&self, id: &str, offset: Option<usize>) -> Result<RecordFetch, CurtainError> {
        let session = self.sessions.current()?;
        self.records.record(&session, id, offset).await
    }

    /// End every poller. The instance stays usable.
    pub fn stop(&self) {
        self.orchestrator.stop();
    }
}
