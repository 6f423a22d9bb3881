//! Search request and result types.

use serde::{Deserialize, Serialize};

use crate::broker::SortSpec;
use crate::error::CurtainError;
use crate::model::{ShowPage, StatSnapshot, TermListFacet};

/// Pazpar2's own default for `num`.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// One search: a CCL query plus the window of the result list to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// CCL query, passed to the broker as is.
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub sort: SortSpec,
}

impl SearchRequest {
    /// First page of `query` in relevance order.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filter: None,
            page: default_page(),
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortSpec::default(),
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    /// Check the request before anything is sent to the broker.
    pub fn validate(&self) -> Result<(), CurtainError> {
        if self.query.trim().is_empty() {
            return Err(CurtainError::InvalidRequest("query is empty".to_string()));
        }
        if self.page == 0 {
            return Err(CurtainError::InvalidRequest(
                "page numbers start at 1".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(CurtainError::InvalidRequest(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.sort.field.trim().is_empty() {
            return Err(CurtainError::InvalidRequest("sort field is empty".to_string()));
        }
        Ok(())
    }
}

/// The joined, converged aggregates of one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub show: ShowPage,
    pub termlist: TermListFacet,
    /// Last stat snapshot, taken once every target finished.
    pub stat: StatSnapshot,
}
