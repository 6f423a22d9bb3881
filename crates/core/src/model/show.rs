//! One page of merged, ranked results (`show` command).

use serde::{Deserialize, Serialize};

use crate::decoder::{Document, Element};
use crate::error::CurtainError;

use super::{expect_root, optional, required, text};

/// Number of pages needed for `total` hits at `page_size` hits per page.
pub fn page_count(total: u64, page_size: u32) -> u64 {
    if total == 0 || page_size == 0 {
        0
    } else {
        total.div_ceil(page_size as u64)
    }
}

/// A holding location as listed on a hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitLocation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digital: Option<String>,
}

impl HitLocation {
    fn from_element(location: &Element) -> Self {
        Self {
            id: location.attr("id").unwrap_or_default().to_string(),
            name: location.attr("name").map(str::to_string),
            checksum: location.attr("checksum").map(str::to_string),
            digital: text(location, "md-digital"),
        }
    }
}

/// Summary of one merged record on a show page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub recid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recno: Option<u64>,
    #[serde(default)]
    pub urls: Vec<String>,
    pub relevance: i64,
    /// Number of target records merged into this hit.
    pub count: u32,
    #[serde(default)]
    pub locations: Vec<HitLocation>,
}

impl Hit {
    fn from_element(hit: &Element) -> Result<Self, CurtainError> {
        let locations: Vec<_> = hit.children_named("location").collect();

        // md-recno is per target record; the first location stands for the hit
        let recno = match optional(hit, "md-recno")? {
            Some(recno) => Some(recno),
            None => match locations.first() {
                Some(location) => optional(location, "md-recno")?,
                None => None,
            },
        };

        Ok(Self {
            recid: required(hit, "recid")?,
            title: text(hit, "md-title"),
            authors: hit.child_texts("md-author"),
            publishers: hit.child_texts("md-publication-name"),
            subjects: hit.child_texts("md-subject"),
            year: text(hit, "md-date"),
            recno,
            urls: hit.child_texts("md-electronic-url"),
            relevance: optional(hit, "relevance")?.unwrap_or(0),
            count: optional(hit, "count")?.unwrap_or(1),
            locations: locations.into_iter().map(HitLocation::from_element).collect(),
        })
    }
}

/// A page of results with pagination computed from the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowPage {
    pub status: String,
    pub activeclients: u32,
    pub merged: u64,
    pub total: u64,
    /// 1-based page number that was requested.
    pub page: u32,
    pub page_size: u32,
    pub page_count: u64,
    /// Index of the first hit as reported by the broker.
    pub start: u64,
    /// Number of hits on this page as reported by the broker.
    pub num: u64,
    /// Wall-clock seconds the search took, set once the search completes.
    pub elapsed_secs: f64,
    pub hits: Vec<Hit>,
}

impl ShowPage {
    pub fn from_document(
        doc: &Document,
        page: u32,
        page_size: u32,
        session: Option<&str>,
    ) -> Result<Self, CurtainError> {
        if page == 0 || page_size == 0 {
            return Err(CurtainError::InvalidRequest(format!(
                "page {} / page size {} must both be at least 1",
                page, page_size
            )));
        }

        let root = expect_root(doc, "show", session)?;
        let total: u64 = required(root, "total")?;
        let hits = root
            .children_named("hit")
            .map(Hit::from_element)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            status: root.child_text("status").unwrap_or("OK").to_string(),
            activeclients: required(root, "activeclients")?,
            merged: optional(root, "merged")?.unwrap_or(0),
            total,
            page,
            page_size,
            page_count: page_count(total, page_size),
            start: optional(root, "start")?.unwrap_or(0),
            num: optional(root, "num")?.unwrap_or(hits.len() as u64),
            elapsed_secs: 0.0,
            hits,
        })
    }

    /// The broker has no target still contributing to this page.
    pub fn is_converged(&self) -> bool {
        self.activeclients == 0
    }
}
