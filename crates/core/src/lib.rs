pub mod broker;
pub mod config;
pub mod connection;
pub mod curtain;
pub mod decoder;
pub mod error;
pub mod model;
pub mod poller;
pub mod record;
pub mod search;
pub mod session;
pub mod testing;

pub use broker::{Broker, Pazpar2Broker, ShowParams, SortDirection, SortSpec, TransportError};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, BrokerConfig,
    Config, ConfigError, PollingConfig, SessionConfig,
};
pub use connection::Connection;
pub use curtain::{Curtain, CurtainOptions};
pub use decoder::{DecodeError, Decoder, Document, Element, XmlDecoder};
pub use error::{CurtainError, INVALID_RECORD_OFFSET, INVALID_SESSION, MISSING_RECORD};
pub use model::{
    page_count, Facet, Hit, HitLocation, Holding, Record, ShowPage, StatSnapshot, Term,
    TermListFacet,
};
pub use poller::{PollLimits, Poller, PollerState, ProgressCallback, ShowPoller, StatPoller, TermlistPoller};
pub use record::{RecordAssembler, RecordFetch};
pub use search::{SearchOrchestrator, SearchRequest, SearchResults};
pub use session::{InitOptions, SessionManager};
