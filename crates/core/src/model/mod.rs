//! Typed aggregates built from decoded broker documents.
//!
//! Every aggregate has a `from_document` constructor that checks the error
//! envelope first, then parses and validates its fields.

mod record;
mod show;
mod stat;
mod termlist;

pub use record::{Holding, Record};
pub use show::{page_count, Hit, HitLocation, ShowPage};
pub use stat::StatSnapshot;
pub use termlist::{Facet, Term, TermListFacet};

use std::str::FromStr;

use crate::decoder::{Document, Element};
use crate::error::CurtainError;

/// Return the root element if it is `<name>`, or the broker error it carries.
pub(crate) fn expect_root<'a>(
    doc: &'a Document,
    name: &str,
    session: Option<&str>,
) -> Result<&'a Element, CurtainError> {
    let root = doc.root();
    if root.name == "error" {
        return Err(broker_error(root, session));
    }
    if root.name != name {
        return Err(CurtainError::MalformedResponse(format!(
            "expected <{}>, got <{}>",
            name, root.name
        )));
    }
    Ok(root)
}

/// Convert an `<error code=".." msg="..">` element into a broker error.
pub(crate) fn broker_error(root: &Element, session: Option<&str>) -> CurtainError {
    let code = root
        .attr("code")
        .and_then(|c| c.trim().parse().ok())
        .unwrap_or(0);
    let message = match root.attr("msg") {
        Some(msg) => msg.to_string(),
        None => root.text.clone(),
    };
    CurtainError::broker(code, message, session)
}

/// Check a `<name><status>OK</status></name>` acknowledgement.
pub(crate) fn expect_ok(
    doc: &Document,
    name: &str,
    session: Option<&str>,
) -> Result<(), CurtainError> {
    let root = expect_root(doc, name, session)?;
    match root.child_text("status") {
        Some("OK") | None => Ok(()),
        Some(other) => Err(CurtainError::MalformedResponse(format!(
            "<{}> status {}",
            name, other
        ))),
    }
}

/// Extract the session token from an `init` reply.
pub(crate) fn session_token(doc: &Document) -> Result<String, CurtainError> {
    expect_ok(doc, "init", None)?;
    match doc.root().child_text("session") {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(CurtainError::MalformedResponse(
            "<init> carries no session".to_string(),
        )),
    }
}

/// Parse the required child `field`.
pub(crate) fn required<T: FromStr>(element: &Element, field: &str) -> Result<T, CurtainError> {
    optional(element, field)?.ok_or_else(|| {
        CurtainError::MalformedResponse(format!("<{}> is missing <{}>", element.name, field))
    })
}

/// Parse the child `field` if present; present but unparsable is an error.
pub(crate) fn optional<T: FromStr>(
    element: &Element,
    field: &str,
) -> Result<Option<T>, CurtainError> {
    match element.child_text(field) {
        None => Ok(None),
        Some(text) => text.trim().parse().map(Some).map_err(|_| {
            CurtainError::MalformedResponse(format!(
                "<{}> has invalid <{}>: {:?}",
                element.name, field, text
            ))
        }),
    }
}

/// First non-empty text of the child `field`.
pub(crate) fn text(element: &Element, field: &str) -> Option<String> {
    element
        .children_named(field)
        .find(|c| !c.text.is_empty())
        .map(|c| c.text.clone())
}
