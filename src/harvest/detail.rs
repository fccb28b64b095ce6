//! Label-based value lookup on a record's detail view
//!
//! The detail view is free-form markup. A value is found by locating an element
//! whose own text contains the label, then reading the first meaningful
//! following sibling of its parent, or failing that the parent's text with the
//! label removed. When several elements carry the label the first match wins.

use crate::browser::{Query, RemoteDom};
use crate::error::Result;
use crate::locate::xpath_literal;

/// XPath matching every element whose own text contains `label`
pub(crate) fn label_holders(label: &str) -> String {
    format!("//*[contains(text(), {})]", xpath_literal(label))
}

/// XPath of the siblings following the parent of the `nth` (1-based) label holder
pub(crate) fn sibling_query(label: &str, nth: usize) -> String {
    format!("({})[{}]/../following-sibling::*", label_holders(label), nth)
}

/// XPath of the parent of the `nth` (1-based) label holder
pub(crate) fn parent_query(label: &str, nth: usize) -> String {
    format!("({})[{}]/..", label_holders(label), nth)
}

/// Value displayed next to `label`, or `None` if it cannot be read.
///
/// Never fails: a lookup error leaves the field empty.
pub fn labeled_value<D: RemoteDom + ?Sized>(dom: &D, label: &str) -> Option<String> {
    match find_labeled_value(dom, label) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Could not read '{}' from detail view: {}", label, e);
            None
        }
    }
}

fn find_labeled_value<D: RemoteDom + ?Sized>(dom: &D, label: &str) -> Result<Option<String>> {
    let holders = dom.find(&Query::xpath(label_holders(label)))?.len();

    for nth in 1..=holders {
        for sibling in dom.find(&Query::xpath(sibling_query(label, nth)))? {
            let text = dom.text(sibling)?;
            if is_value(text.trim(), label) {
                return Ok(Some(text.trim().to_string()));
            }
        }

        if let Some(&parent) = dom.find(&Query::xpath(parent_query(label, nth)))?.first() {
            let text = dom.text(parent)?.replace(label, "");
            let value = text.trim().trim_matches(':').trim();
            if is_value(value, label) {
                return Ok(Some(value.to_string()));
            }
        }
    }

    Ok(None)
}

fn is_value(text: &str, label: &str) -> bool {
    !text.is_empty() && text != ":" && text != label
}
