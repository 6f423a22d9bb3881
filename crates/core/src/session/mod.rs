//! Broker session lifecycle.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::CurtainError;
use crate::model::{expect_ok, session_token};

/// Options for [`SessionManager::init`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitOptions {
    /// Session to reuse. Falls back to the seeded session when absent.
    #[serde(default)]
    pub session: Option<String>,
    /// Validate the session with a ping instead of always replacing it.
    #[serde(default)]
    pub safe: bool,
}

impl InitOptions {
    /// Always request a fresh session.
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Keep `session` if the broker still knows it.
    pub fn reuse(session: impl Into<String>) -> Self {
        Self {
            session: Some(session.into()),
            safe: true,
        }
    }
}

/// Owns the one live session token of a Curtain instance.
#[derive(Debug)]
pub struct SessionManager {
    connection: Connection,
    current: RwLock<Option<String>>,
}

impl SessionManager {
    pub fn new(connection: Connection) -> Self {
        Self::with_session(connection, None)
    }

    /// Create a manager seeded with a known session, e.g. from configuration.
    pub fn with_session(connection: Connection, session: Option<String>) -> Self {
        Self {
            connection,
            current: RwLock::new(session.filter(|s| !s.is_empty())),
        }
    }

    /// The live session token.
    pub fn current(&self) -> Result<String, CurtainError> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(CurtainError::NotInitialized)
    }

    /// Establish the live session and return its token.
    ///
    /// With `safe` set, the requested (or seeded) session is kept if a ping
    /// succeeds. Otherwise, or if the ping fails, a new session replaces it.
    pub async fn init(&self, options: InitOptions) -> Result<String, CurtainError> {
        if options.safe {
            let candidate = options.session.or_else(|| self.current().ok());
            if let Some(candidate) = candidate {
                match self.ping_session(&candidate).await {
                    Ok(()) => {
                        debug!(session = %candidate, "session still valid");
                        self.replace(candidate.clone());
                        return Ok(candidate);
                    }
                    Err(e) => {
                        warn!(session = %candidate, error = %e, "session rejected, creating a new one");
                    }
                }
            }
        }

        let raw = self.connection.broker().create_session().await?;
        let doc = self.connection.decode(&raw)?;
        let token = session_token(&doc)?;

        info!(session = %token, broker = self.connection.broker().name(), "session created");
        self.replace(token.clone());
        Ok(token)
    }

    /// Probe the broker with the live session.
    pub async fn ping(&self) -> Result<(), CurtainError> {
        let session = self.current()?;
        self.ping_session(&session).await
    }

    /// Whether the live session still answers a ping.
    pub async fn is_session_valid(&self) -> bool {
        self.ping().await.is_ok()
    }

    async fn ping_session(&self, session: &str) -> Result<(), CurtainError> {
        let raw = self.connection.broker().ping(session).await?;
        let doc = self.connection.decode(&raw)?;
        expect_ok(&doc, "ping", Some(session))
    }

    fn replace(&self, token: String) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::broker::TransportError;
    use crate::decoder::XmlDecoder;
    use crate::testing::{fixtures, MockBroker};

    fn manager(broker: &Arc<MockBroker>, seed: Option<&str>) -> SessionManager {
        let connection = Connection::new(broker.clone(), Arc::new(XmlDecoder::new()));
        SessionManager::with_session(connection, seed.map(str::to_string))
    }

    #[tokio::test]
    async fn test_init_creates_session() {
        let broker = Arc::new(MockBroker::new());
        broker.push_init(fixtures::init_xml("2044502273"));
        let sessions = manager(&broker, None);

        assert!(matches!(sessions.current(), Err(CurtainError::NotInitialized)));

        let token = sessions.init(InitOptions::fresh()).await.unwrap();
        assert_eq!(token, "2044502273");
        assert_eq!(sessions.current().unwrap(), "2044502273");
        assert_eq!(broker.calls_to("ping"), 0);
    }

    #[tokio::test]
    async fn test_safe_init_keeps_valid_session() {
        let broker = Arc::new(MockBroker::new());
        let sessions = manager(&broker, None);

        let token = sessions.init(InitOptions::reuse("S1")).await.unwrap();

        assert_eq!(token, "S1");
        assert_eq!(broker.calls_to("ping"), 1);
        assert_eq!(broker.calls_to("init"), 0);
    }

    #[tokio::test]
    async fn test_safe_init_replaces_rejected_session() {
        let broker = Arc::new(MockBroker::new());
        broker.push_ping(fixtures::error_xml(1, "Session does not exist or it has expired"));
        broker.push_init(fixtures::init_xml("S2"));
        let sessions = manager(&broker, None);

        let token = sessions.init(InitOptions::reuse("S1")).await.unwrap();

        assert_eq!(token, "S2");
        assert_eq!(sessions.current().unwrap(), "S2");
        assert_eq!(broker.calls_to("ping"), 1);
        assert_eq!(broker.calls_to("init"), 1);
    }

    #[tokio::test]
    async fn test_safe_init_replaces_on_transport_failure() {
        let broker = Arc::new(MockBroker::new());
        broker.fail_next("ping", TransportError::Timeout);
        let sessions = manager(&broker, None);

        let token = sessions.init(InitOptions::reuse("S1")).await.unwrap();
        assert_ne!(token, "S1");
    }

    #[tokio::test]
    async fn test_unsafe_init_discards_supplied_session() {
        let broker = Arc::new(MockBroker::new());
        let sessions = manager(&broker, Some("seeded"));

        let token = sessions
            .init(InitOptions {
                session: Some("S1".to_string()),
                safe: false,
            })
            .await
            .unwrap();

        assert_eq!(token, "mock-session-1");
        assert_eq!(broker.calls_to("ping"), 0);
    }

    #[tokio::test]
    async fn test_safe_init_validates_seeded_session() {
        let broker = Arc::new(MockBroker::new());
        let sessions = manager(&broker, Some("seeded"));

        let token = sessions
            .init(InitOptions {
                session: None,
                safe: true,
            })
            .await
            .unwrap();

        assert_eq!(token, "seeded");
        assert_eq!(broker.calls()[0].session.as_deref(), Some("seeded"));
    }

    #[tokio::test]
    async fn test_ping_requires_session() {
        let broker = Arc::new(MockBroker::new());
        let sessions = manager(&broker, None);

        assert!(matches!(sessions.ping().await, Err(CurtainError::NotInitialized)));
        assert!(!sessions.is_session_valid().await);
        assert_eq!(broker.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_is_session_valid_follows_ping() {
        let broker = Arc::new(MockBroker::new());
        let sessions = manager(&broker, Some("S1"));
        assert!(sessions.is_session_valid().await);

        broker.push_ping(fixtures::error_xml(1, "expired"));
        assert!(!sessions.is_session_valid().await);
    }

    #[tokio::test]
    async fn test_malformed_init_keeps_previous_session() {
        let broker = Arc::new(MockBroker::new());
        broker.push_init("<init><status>OK</status></init>");
        let sessions = manager(&broker, Some("S1"));

        let err = sessions.init(InitOptions::fresh()).await.unwrap_err();
        assert!(matches!(err, CurtainError::MalformedResponse(_)));
        assert_eq!(sessions.current().unwrap(), "S1");
    }
}
