//! Search progress snapshot (`stat` command).

use serde::{Deserialize, Serialize};

use crate::decoder::Document;
use crate::error::CurtainError;

use super::{expect_root, optional, required};

/// Progress counters reported by the broker for the running search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub activeclients: u32,
    pub hits: u64,
    pub records: u64,
    pub clients: u32,
    pub unconnected: u32,
    pub connecting: u32,
    pub working: u32,
    pub idle: u32,
    pub failed: u32,
    pub error: u32,
    /// Fraction of targets done, in `[0, 1]`.
    pub progress: f64,
}

impl StatSnapshot {
    pub fn from_document(doc: &Document, session: Option<&str>) -> Result<Self, CurtainError> {
        let root = expect_root(doc, "stat", session)?;

        let progress: f64 = optional(root, "progress")?.unwrap_or(0.0);
        if progress.is_nan() {
            return Err(CurtainError::MalformedResponse(
                "<stat> progress is NaN".to_string(),
            ));
        }

        Ok(Self {
            activeclients: required(root, "activeclients")?,
            hits: required(root, "hits")?,
            records: optional(root, "records")?.unwrap_or(0),
            clients: optional(root, "clients")?.unwrap_or(0),
            unconnected: optional(root, "unconnected")?.unwrap_or(0),
            connecting: optional(root, "connecting")?.unwrap_or(0),
            working: required(root, "working")?,
            idle: optional(root, "idle")?.unwrap_or(0),
            failed: optional(root, "failed")?.unwrap_or(0),
            error: optional(root, "error")?.unwrap_or(0),
            progress: progress.clamp(0.0, 1.0),
        })
    }

    /// The search has finished on every target.
    pub fn is_converged(&self) -> bool {
        self.working == 0
    }
}
