//! Selector resolution
//!
//! Maps a semantic field ("username field", "submit control") onto whatever
//! element the current page uses for it. Each field carries an ordered list of
//! [`Locator`] strategies; the first strategy that yields a visible element
//! wins. An unmatched field is a normal outcome (`None`), not an error.

pub mod locator;

pub use locator::{Locator, xpath_literal};

use crate::browser::{NodeRef, Query, RemoteDom};
use crate::error::Result;
use std::fmt;

/// Input-like elements considered by the first-visible-input fallback
const INPUT_LIKE: &str =
    "input:not([type=\"hidden\"]):not([type=\"submit\"]):not([type=\"button\"]):not([type=\"checkbox\"]), textarea";

/// A role an element plays on the login page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticField {
    Username,
    Password,
    Submit,
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticField::Username => "username field",
            SemanticField::Password => "password field",
            SemanticField::Submit => "submit control",
        };
        f.write_str(name)
    }
}

/// Ordered locator strategies for one semantic field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub field: SemanticField,

    /// Strategies tried in order
    pub candidates: Vec<Locator>,

    /// Settle for the first visible input on the page when every strategy misses
    pub fallback_to_first_visible_input: bool,
}

impl FieldSpec {
    pub fn new(field: SemanticField, candidates: Vec<Locator>) -> Self {
        Self { field, candidates, fallback_to_first_visible_input: false }
    }

    /// Builder method: enable the first-visible-input fallback
    pub fn with_input_fallback(mut self) -> Self {
        self.fallback_to_first_visible_input = true;
        self
    }

    /// Username/email field of the portal login form
    pub fn username() -> Self {
        Self::new(
            SemanticField::Username,
            vec![Locator::name("email"), Locator::input_type("email"), Locator::input_type("text")],
        )
        .with_input_fallback()
    }

    /// Password field of the portal login form
    pub fn password() -> Self {
        Self::new(
            SemanticField::Password,
            vec![Locator::input_type("password"), Locator::name("password")],
        )
    }

    /// Control that submits the login form
    pub fn submit() -> Self {
        Self::new(
            SemanticField::Submit,
            vec![
                Locator::css("button[type=\"submit\"]"),
                Locator::css("input[type=\"submit\"]"),
                Locator::button_text("login"),
                Locator::button_text("sign in"),
            ],
        )
    }
}

/// How a field was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    /// Index into `FieldSpec::candidates`
    Candidate(usize),
    FirstVisibleInput,
}

/// A resolved element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMatch {
    pub node: NodeRef,
    pub source: MatchSource,
}

/// Resolve `spec` against the current page.
///
/// Returns `Ok(None)` when nothing visible matches; only session failures are errors.
pub fn resolve<D: RemoteDom + ?Sized>(dom: &D, spec: &FieldSpec) -> Result<Option<FieldMatch>> {
    for (index, locator) in spec.candidates.iter().enumerate() {
        if let Some(node) = first_visible(dom, &locator.to_query())? {
            log::debug!("Resolved {} via {}", spec.field, locator);
            return Ok(Some(FieldMatch { node, source: MatchSource::Candidate(index) }));
        }
    }

    if spec.fallback_to_first_visible_input {
        if let Some(node) = first_visible(dom, &Query::css(INPUT_LIKE))? {
            log::debug!("Resolved {} via first visible input", spec.field);
            return Ok(Some(FieldMatch { node, source: MatchSource::FirstVisibleInput }));
        }
    }

    log::debug!("No visible match for {}", spec.field);
    Ok(None)
}

fn first_visible<D: RemoteDom + ?Sized>(dom: &D, query: &Query) -> Result<Option<NodeRef>> {
    for node in dom.find(query)? {
        // An element detached between query and check is just not visible
        match dom.is_visible(node) {
            Ok(true) => return Ok(Some(node)),
            Ok(false) => continue,
            Err(e) => log::debug!("Visibility check failed for {:?}: {}", node, e),
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeDom;
    use crate::error::MonitorError;

    fn text_input() -> Query {
        Query::css("input[type=\"text\"]")
    }

    #[test]
    fn test_resolves_to_only_visible_text_input() {
        let dom = FakeDom::new().with(text_input(), &[7]);

        let spec = FieldSpec::new(
            SemanticField::Username,
            vec![Locator::name("email"), Locator::input_type("email"), Locator::input_type("text")],
        );
        let found = resolve(&dom, &spec).unwrap().expect("text input should resolve");

        assert_eq!(found.node, NodeRef(7));
        assert_eq!(found.source, MatchSource::Candidate(2));
    }

    #[test]
    fn test_earlier_candidate_wins() {
        let dom = FakeDom::new()
            .with(Query::css("[name=\"email\"]"), &[3])
            .with(text_input(), &[7]);

        let found = resolve(&dom, &FieldSpec::username()).unwrap().unwrap();
        assert_eq!(found.node, NodeRef(3));
        assert_eq!(found.source, MatchSource::Candidate(0));
    }

    #[test]
    fn test_hidden_matches_are_skipped() {
        let dom = FakeDom::new()
            .with(Query::css("[name=\"email\"]"), &[3, 4])
            .hidden(3)
            .with(text_input(), &[7]);

        let found = resolve(&dom, &FieldSpec::username()).unwrap().unwrap();
        assert_eq!(found.node, NodeRef(4));
    }

    #[test]
    fn test_fallback_to_first_visible_input() {
        let dom = FakeDom::new().with(Query::css(INPUT_LIKE), &[11, 12]).hidden(11);

        let found = resolve(&dom, &FieldSpec::username()).unwrap().unwrap();
        assert_eq!(found.node, NodeRef(12));
        assert_eq!(found.source, MatchSource::FirstVisibleInput);
    }

    #[test]
    fn test_no_fallback_unless_marked() {
        let dom = FakeDom::new().with(Query::css(INPUT_LIKE), &[11]);

        assert_eq!(resolve(&dom, &FieldSpec::password()).unwrap(), None);
    }

    #[test]
    fn test_not_found_is_not_an_error() {
        let dom = FakeDom::new();
        assert_eq!(resolve(&dom, &FieldSpec::submit()).unwrap(), None);
    }

    #[test]
    fn test_transport_failure_propagates() {
        let dom = FakeDom::new().failing_query(Query::css("[name=\"email\"]"));
        let result = resolve(&dom, &FieldSpec::username());
        assert!(matches!(result, Err(MonitorError::Transport(_))));
    }

    #[test]
    fn test_field_display() {
        assert_eq!(SemanticField::Username.to_string(), "username field");
        assert_eq!(SemanticField::Submit.to_string(), "submit control");
    }
}
