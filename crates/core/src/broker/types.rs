//! Parameter types for broker commands.

use serde::{Deserialize, Serialize};

/// Sort direction for a show page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    /// Pazpar2 flag: `1` ascending, `0` descending.
    pub fn as_flag(&self) -> u8 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => 0,
        }
    }
}

/// Sort field and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Render as the broker's `sort` parameter, e.g. `relevance:0`.
    pub fn to_param(&self) -> String {
        format!("{}:{}", self.field, self.direction.as_flag())
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new("relevance", SortDirection::Descending)
    }
}

/// Window and ordering of a show request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowParams {
    /// Zero-based index of the first hit.
    pub start: u32,
    /// Number of hits to return.
    pub num: u32,
    pub sort: SortSpec,
}

impl ShowParams {
    /// Parameters for the 1-based `page` of `page_size` hits.
    pub fn for_page(page: u32, page_size: u32, sort: SortSpec) -> Self {
        let start = if page <= 1 {
            0
        } else {
            (page - 1).saturating_mul(page_size)
        };
        Self {
            start,
            num: page_size,
            sort,
        }
    }
}
