//! Errors surfaced by the Curtain core.

use thiserror::Error;

use crate::broker::TransportError;
use crate::decoder::DecodeError;

/// Broker error code: the session does not exist or has expired.
pub const INVALID_SESSION: i32 = 1;

/// Broker error code: no record with the requested id.
pub const MISSING_RECORD: i32 = 7;

/// Broker error code: the record has no holding at the requested offset.
pub const INVALID_RECORD_OFFSET: i32 = 10;

/// Errors that can occur while talking to the broker through Curtain.
#[derive(Debug, Error)]
pub enum CurtainError {
    /// The underlying broker call failed. Never retried.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A response could not be decoded into a document.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The broker answered with an error envelope.
    #[error("broker error {code}: {message}")]
    Broker {
        code: i32,
        message: String,
        session: Option<String>,
    },

    /// The document decoded, but a required field is missing or unparsable.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A search (or record lookup) is already running on this instance.
    #[error("search already in progress")]
    SearchInProgress,

    /// `poll` was called on a poller that is already polling.
    #[error("{0} poller is already polling")]
    AlreadyPolling(&'static str),

    /// A poller hit its tick or wall-clock limit before converging.
    #[error("{poller} poller did not converge after {ticks} ticks")]
    PollTimeout { poller: &'static str, ticks: u32 },

    /// The operation was cancelled by its caller or by `stop()`.
    #[error("operation cancelled")]
    Cancelled,

    /// No session has been established yet.
    #[error("no session, call init() first")]
    NotInitialized,

    /// The request failed validation before reaching the broker.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl CurtainError {
    /// Build a broker error with the session it was observed on.
    pub fn broker(code: i32, message: impl Into<String>, session: Option<&str>) -> Self {
        CurtainError::Broker {
            code,
            message: message.into(),
            session: session.map(str::to_string),
        }
    }

    /// The broker error code, if this is a broker error.
    pub fn code(&self) -> Option<i32> {
        match self {
            CurtainError::Broker { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_invalid_session(&self) -> bool {
        self.code() == Some(INVALID_SESSION)
    }

    pub fn is_missing_record(&self) -> bool {
        self.code() == Some(MISSING_RECORD)
    }

    pub fn is_invalid_record_offset(&self) -> bool {
        self.code() == Some(INVALID_RECORD_OFFSET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_error_display() {
        let err = CurtainError::broker(INVALID_SESSION, "Session does not exist", Some("42"));
        assert_eq!(err.to_string(), "broker error 1: Session does not exist");
        assert!(err.is_invalid_session());
        assert!(!err.is_missing_record());

        match err {
            CurtainError::Broker { session, .. } => assert_eq!(session.as_deref(), Some("42")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_code_only_for_broker_errors() {
        assert_eq!(CurtainError::SearchInProgress.code(), None);
        assert_eq!(
            CurtainError::broker(MISSING_RECORD, "missing", None).code(),
            Some(7)
        );
        assert!(CurtainError::broker(INVALID_RECORD_OFFSET, "offset", None)
            .is_invalid_record_offset());
    }

    #[test]
    fn test_poll_timeout_display() {
        let err = CurtainError::PollTimeout {
            poller: "stat",
            ticks: 3,
        };
        assert_eq!(err.to_string(), "stat poller did not converge after 3 ticks");
    }
}
