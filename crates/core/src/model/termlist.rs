//! Facet term lists (`termlist` command).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::decoder::{Document, Element};
use crate::error::CurtainError;

use super::{expect_root, required};

/// One facet value and how many hits carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub name: String,
    pub frequency: u64,
}

/// Frequency-ranked values of one facet, in broker order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    #[serde(rename = "type")]
    pub kind: String,
    pub terms: Vec<Term>,
}

/// Facets keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermListFacet {
    facets: BTreeMap<String, Facet>,
}

impl TermListFacet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a termlist reply, also returning its `activeclients` count.
    pub fn from_document(
        doc: &Document,
        session: Option<&str>,
    ) -> Result<(Self, u32), CurtainError> {
        let root = expect_root(doc, "termlist", session)?;
        let activeclients = required(root, "activeclients")?;

        let mut facets = BTreeMap::new();
        for list in root.children_named("list") {
            let facet = parse_list(list)?;
            facets.insert(facet.kind.clone(), facet);
        }

        Ok((Self { facets }, activeclients))
    }

    pub fn get(&self, name: &str) -> Option<&Facet> {
        self.facets.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.facets.keys().map(String::as_str)
    }
}

fn parse_list(list: &Element) -> Result<Facet, CurtainError> {
    let kind = list
        .attr("name")
        .ok_or_else(|| CurtainError::MalformedResponse("<list> without name".to_string()))?
        .to_string();

    let terms = list
        .children_named("term")
        .map(|term| -> Result<Term, CurtainError> {
            Ok(Term {
                name: required(term, "name")?,
                frequency: required(term, "frequency")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Facet { kind, terms })
}
