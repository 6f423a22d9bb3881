//! Full bibliographic record (`record` command).

use serde::{Deserialize, Serialize};

use crate::decoder::{Document, Element};
use crate::error::CurtainError;

use super::{expect_root, required, text};

/// One location holding a copy of the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digital: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bib_level: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    /// Raw target record exactly as the broker sent it, attached by the
    /// record assembler. Targets may answer in MARC-8 or Latin-1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
}

impl Holding {
    fn from_element(location: &Element) -> Self {
        Self {
            id: location.attr("id").unwrap_or_default().to_string(),
            name: location.attr("name").map(str::to_string),
            checksum: location.attr("checksum").map(str::to_string),
            digital: text(location, "md-digital"),
            record_type: text(location, "md-record-type"),
            bib_level: text(location, "md-bib-level"),
            subjects: location.child_texts("md-subject"),
            content: None,
        }
    }
}

/// A merged record with its holdings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub recid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    pub holdings: Vec<Holding>,
}

impl Record {
    pub fn from_document(doc: &Document, session: Option<&str>) -> Result<Self, CurtainError> {
        let root = expect_root(doc, "record", session)?;

        Ok(Self {
            recid: required(root, "recid")?,
            title: text(root, "md-title"),
            authors: root.child_texts("md-author"),
            publishers: root.child_texts("md-publication-name"),
            year: text(root, "md-date"),
            holdings: root
                .children_named("location")
                .map(Holding::from_element)
                .collect(),
        })
    }
}
