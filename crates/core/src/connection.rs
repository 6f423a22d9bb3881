//! Broker transport and decoder bundled as one cloneable value.

use std::sync::Arc;

use crate::broker::Broker;
use crate::decoder::{Decoder, Document};
use crate::error::CurtainError;

/// The broker/decoder pair every component talks through.
#[derive(Clone)]
pub struct Connection {
    broker: Arc<dyn Broker>,
    decoder: Arc<dyn Decoder>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("broker", &self.broker.name())
            .finish()
    }
}

impl Connection {
    pub fn new(broker: Arc<dyn Broker>, decoder: Arc<dyn Decoder>) -> Self {
        Self { broker, decoder }
    }

    pub fn broker(&self) -> &dyn Broker {
        self.broker.as_ref()
    }

    pub fn decode(&self, raw: &[u8]) -> Result<Document, CurtainError> {
        Ok(self.decoder.decode(raw)?)
    }
}
