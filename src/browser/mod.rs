//! Remote DOM session abstraction
//!
//! The monitor never talks to Chrome directly. Everything it needs from a
//! rendered page goes through the [`RemoteDom`] trait:
//! - `BrowserSession`: the headless_chrome implementation
//! - `wait_until`: bounded polling wait for client-side rendering
//! - `SessionFactory` / `SessionGuard`: one fresh session per cycle, always closed

pub mod config;
pub mod session;
pub mod wait;

#[cfg(test)]
pub(crate) mod fake;

pub use config::LaunchOptions;
pub use session::{BrowserSession, ChromeLauncher};
pub use wait::wait_until;

use crate::error::Result;
use std::ops::Deref;

/// Opaque handle to an element of the current document.
///
/// Handles are only meaningful until the next navigation or re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub u32);

/// A document query understood by the session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    Css(String),
    XPath(String),
}

impl Query {
    pub fn css(selector: impl Into<String>) -> Self {
        Query::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Query::XPath(expression.into())
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::Css(selector) => write!(f, "css:{}", selector),
            Query::XPath(expression) => write!(f, "xpath:{}", expression),
        }
    }
}

/// Capabilities consumed from a rendered, scriptable page.
///
/// Every method may fail with a transport error; "nothing matched" is an
/// empty `Vec`, never an error.
pub trait RemoteDom {
    /// Navigate the page to `url` and wait for the load event
    fn navigate(&self, url: &str) -> Result<()>;

    /// Find all elements matching `query`, in document order
    fn find(&self, query: &Query) -> Result<Vec<NodeRef>>;

    /// Find descendants of `scope` matching a CSS selector, in document order
    fn find_in(&self, scope: NodeRef, css: &str) -> Result<Vec<NodeRef>>;

    /// Rendered text of an element
    fn text(&self, node: NodeRef) -> Result<String>;

    fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>>;

    /// Whether the element currently occupies visible space on the page
    fn is_visible(&self, node: NodeRef) -> Result<bool>;

    fn click(&self, node: NodeRef) -> Result<()>;

    /// Clear the current value of an input-like element
    fn clear(&self, node: NodeRef) -> Result<()>;

    fn type_into(&self, node: NodeRef, text: &str) -> Result<()>;

    /// Focus the element and press Enter
    fn press_enter(&self, node: NodeRef) -> Result<()>;

    /// Evaluate a JavaScript expression and return its JSON value
    fn execute(&self, script: &str) -> Result<serde_json::Value>;

    fn current_url(&self) -> Result<String>;

    fn title(&self) -> Result<String>;

    /// Release the underlying browser resources
    fn close(&self) -> Result<()>;
}

/// Opens a fresh DOM session for each cycle
pub trait SessionFactory {
    type Session: RemoteDom;

    fn open(&self) -> Result<Self::Session>;
}

/// Owns a session for the duration of a cycle and closes it on every exit path
pub struct SessionGuard<S: RemoteDom> {
    session: S,
}

impl<S: RemoteDom> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

impl<S: RemoteDom> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: RemoteDom> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        match self.session.close() {
            Ok(()) => log::info!("Browser closed"),
            Err(e) => log::warn!("Failed to close browser session cleanly: {}", e),
        }
    }
}
