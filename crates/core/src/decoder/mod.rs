//! Raw response decoding.
//!
//! The broker answers every command with a small XML document. A `Decoder`
//! turns those bytes into a generic element tree; the typed aggregates in
//! [`crate::model`] are built from that tree.

mod document;
mod xml;

pub use document::{Document, Element};
pub use xml::XmlDecoder;

use thiserror::Error;

/// Errors produced while decoding a raw broker response.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The response contained no root element.
    #[error("document is empty")]
    Empty,

    /// The response is not well-formed.
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Turns raw broker responses into documents.
pub trait Decoder: Send + Sync {
    /// Decode one response body.
    fn decode(&self, raw: &[u8]) -> Result<Document, DecodeError>;
}
