//! Testing utilities: a scriptable mock broker and Pazpar2 XML fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use curtain_core::testing::{fixtures, MockBroker};
//!
//! let broker = Arc::new(MockBroker::new());
//! broker.push_stat(fixtures::stat_xml(1, 0.5, 10));
//! broker.push_stat(fixtures::stat_xml(0, 1.0, 12));
//!
//! let curtain = Curtain::with_collaborators(options, broker.clone(), Arc::new(XmlDecoder::new()));
//! // ...
//! assert_eq!(broker.calls_to("stat"), 2);
//! ```

mod mock_broker;

pub use mock_broker::{MockBroker, RecordedCall};

/// Builders for Pazpar2 response documents.
pub mod fixtures {
    /// `init` reply carrying `session`.
    pub fn init_xml(session: &str) -> String {
        format!(
            "<init><status>OK</status><session>{}</session><protocol>1</protocol></init>",
            session
        )
    }

    /// `<command><status>OK</status></command>` acknowledgement.
    pub fn ok_xml(command: &str) -> String {
        format!("<{0}><status>OK</status></{0}>", command)
    }

    /// Broker error envelope.
    pub fn error_xml(code: i32, message: &str) -> String {
        format!(r#"<error code="{}" msg="{}"></error>"#, code, message)
    }

    /// `stat` reply with `working` targets still busy.
    pub fn stat_xml(working: u32, progress: f64, hits: u64) -> String {
        format!(
            "<stat><activeclients>{working}</activeclients><hits>{hits}</hits>\
             <records>{hits}</records><clients>3</clients><unconnected>0</unconnected>\
             <connecting>0</connecting><working>{working}</working><idle>{idle}</idle>\
             <failed>0</failed><error>0</error><progress>{progress:.2}</progress></stat>",
            idle = 3u32.saturating_sub(working),
        )
    }

    /// `show` reply listing one hit per entry of `recids`.
    pub fn show_xml(activeclients: u32, total: u64, recids: &[&str]) -> String {
        let hits: String = recids
            .iter()
            .enumerate()
            .map(|(i, recid)| {
                format!(
                    "<hit><md-title>Title {i}</md-title><md-author>Author {i}</md-author>\
                     <md-date>19{i:02}</md-date>\
                     <location id=\"target-{i}\" name=\"Target {i}\" checksum=\"{i}\">\
                     <md-recno>{recno}</md-recno></location>\
                     <count>1</count><relevance>{relevance}</relevance><recid>{recid}</recid></hit>",
                    recno = i + 1,
                    relevance = 1000 - i,
                )
            })
            .collect();

        format!(
            "<show><status>OK</status><activeclients>{}</activeclients><merged>{}</merged>\
             <total>{}</total><start>0</start><num>{}</num>{}</show>",
            activeclients,
            recids.len(),
            total,
            recids.len(),
            hits
        )
    }

    /// `termlist` reply with the given facets and `(term, frequency)` pairs.
    pub fn termlist_xml(activeclients: u32, lists: &[(&str, &[(&str, u64)])]) -> String {
        let lists: String = lists
            .iter()
            .map(|(name, terms)| {
                let terms: String = terms
                    .iter()
                    .map(|(term, frequency)| {
                        format!(
                            "<term><name>{}</name><frequency>{}</frequency></term>",
                            term, frequency
                        )
                    })
                    .collect();
                format!("<list name=\"{}\">{}</list>", name, terms)
            })
            .collect();

        format!(
            "<termlist><activeclients>{}</activeclients>{}</termlist>",
            activeclients, lists
        )
    }

    /// Plain `record` reply with one location per entry of `holdings`.
    pub fn record_xml(recid: &str, holdings: &[&str]) -> String {
        let locations: String = holdings
            .iter()
            .map(|id| {
                format!(
                    "<location id=\"{0}\" name=\"{0}\" checksum=\"1\">\
                     <md-digital>no</md-digital><md-record-type>a</md-record-type>\
                     <md-bib-level>m</md-bib-level><md-subject>Drama</md-subject></location>",
                    id
                )
            })
            .collect();

        format!(
            "<record><recid>{}</recid><md-title>Saint Joan</md-title>\
             <md-author>Shaw, Bernard</md-author><md-publication-name>Penguin</md-publication-name>\
             <md-date>1946</md-date>{}</record>",
            recid, locations
        )
    }
}
