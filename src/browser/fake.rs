//! Scripted in-memory page used by unit tests

use super::{NodeRef, Query, RemoteDom, SessionFactory};
use crate::error::{MonitorError, Result};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// Side effects recorded by [`FakeDom`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    Navigate(String),
    Click(NodeRef),
    Clear(NodeRef),
    Type(NodeRef, String),
    Enter(NodeRef),
    Execute(String),
}

#[derive(Default)]
pub(crate) struct FakeDom {
    queries: HashMap<Query, Vec<NodeRef>>,
    scoped: HashMap<(NodeRef, String), Vec<NodeRef>>,
    texts: HashMap<NodeRef, String>,
    attributes: HashMap<(NodeRef, String), String>,
    hidden: HashSet<NodeRef>,
    failing: HashSet<Query>,
    failing_clicks: HashSet<NodeRef>,
    navigation_budget: Cell<Option<usize>>,
    click_redirects: HashMap<NodeRef, String>,
    scripts: RefCell<HashMap<String, VecDeque<Value>>>,
    url: RefCell<String>,
    actions: RefCell<Vec<Action>>,
    closed: Rc<Cell<usize>>,
}

impl FakeDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `query` return `nodes`
    pub fn with(mut self, query: Query, nodes: &[u32]) -> Self {
        self.queries.insert(query, nodes.iter().copied().map(NodeRef).collect());
        self
    }

    /// Make `find_in(scope, css)` return `nodes`
    pub fn with_children(mut self, scope: u32, css: &str, nodes: &[u32]) -> Self {
        self.scoped
            .insert((NodeRef(scope), css.to_string()), nodes.iter().copied().map(NodeRef).collect());
        self
    }

    pub fn with_text(mut self, node: u32, text: &str) -> Self {
        self.texts.insert(NodeRef(node), text.to_string());
        self
    }

    pub fn with_attribute(mut self, node: u32, name: &str, value: &str) -> Self {
        self.attributes.insert((NodeRef(node), name.to_string()), value.to_string());
        self
    }

    pub fn hidden(mut self, node: u32) -> Self {
        self.hidden.insert(NodeRef(node));
        self
    }

    pub fn failing_query(mut self, query: Query) -> Self {
        self.failing.insert(query);
        self
    }

    pub fn failing_click(mut self, node: u32) -> Self {
        self.failing_clicks.insert(NodeRef(node));
        self
    }

    /// Allow only `count` successful navigations; later ones fail
    pub fn navigation_budget(self, count: usize) -> Self {
        self.navigation_budget.set(Some(count));
        self
    }

    /// Clicking `node` changes the current URL
    pub fn redirect_on_click(mut self, node: u32, url: &str) -> Self {
        self.click_redirects.insert(NodeRef(node), url.to_string());
        self
    }

    /// Queue successive return values for `script`; running out is a transport error
    pub fn script_results(self, script: &str, values: Vec<Value>) -> Self {
        self.scripts.borrow_mut().insert(script.to_string(), values.into());
        self
    }

    /// Count closes into `counter`, shared with other fakes
    pub fn sharing_close_counter(mut self, counter: &Rc<Cell<usize>>) -> Self {
        self.closed = Rc::clone(counter);
        self
    }

    pub fn close_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.closed)
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.borrow().clone()
    }

    pub fn executions_of(&self, script: &str) -> usize {
        self.actions
            .borrow()
            .iter()
            .filter(|a| matches!(a, Action::Execute(s) if s == script))
            .count()
    }

    fn record(&self, action: Action) {
        self.actions.borrow_mut().push(action);
    }
}

impl RemoteDom for FakeDom {
    fn navigate(&self, url: &str) -> Result<()> {
        if let Some(remaining) = self.navigation_budget.get() {
            if remaining == 0 {
                return Err(MonitorError::Transport(format!("navigation to {} refused", url)));
            }
            self.navigation_budget.set(Some(remaining - 1));
        }
        self.record(Action::Navigate(url.to_string()));
        *self.url.borrow_mut() = url.to_string();
        Ok(())
    }

    fn find(&self, query: &Query) -> Result<Vec<NodeRef>> {
        if self.failing.contains(query) {
            return Err(MonitorError::Transport(format!("query {} failed", query)));
        }
        Ok(self.queries.get(query).cloned().unwrap_or_default())
    }

    fn find_in(&self, scope: NodeRef, css: &str) -> Result<Vec<NodeRef>> {
        Ok(self.scoped.get(&(scope, css.to_string())).cloned().unwrap_or_default())
    }

    fn text(&self, node: NodeRef) -> Result<String> {
        Ok(self.texts.get(&node).cloned().unwrap_or_default())
    }

    fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>> {
        Ok(self.attributes.get(&(node, name.to_string())).cloned())
    }

    fn is_visible(&self, node: NodeRef) -> Result<bool> {
        Ok(!self.hidden.contains(&node))
    }

    fn click(&self, node: NodeRef) -> Result<()> {
        if self.failing_clicks.contains(&node) {
            return Err(MonitorError::Transport(format!("click on {:?} failed", node)));
        }
        self.record(Action::Click(node));
        if let Some(url) = self.click_redirects.get(&node) {
            *self.url.borrow_mut() = url.clone();
        }
        Ok(())
    }

    fn clear(&self, node: NodeRef) -> Result<()> {
        self.record(Action::Clear(node));
        Ok(())
    }

    fn type_into(&self, node: NodeRef, text: &str) -> Result<()> {
        self.record(Action::Type(node, text.to_string()));
        Ok(())
    }

    fn press_enter(&self, node: NodeRef) -> Result<()> {
        self.record(Action::Enter(node));
        Ok(())
    }

    fn execute(&self, script: &str) -> Result<Value> {
        self.record(Action::Execute(script.to_string()));
        let mut scripts = self.scripts.borrow_mut();
        match scripts.get_mut(script) {
            Some(queue) => queue
                .pop_front()
                .ok_or_else(|| MonitorError::Transport(format!("no result left for script: {}", script))),
            None => Ok(Value::Null),
        }
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.url.borrow().clone())
    }

    fn title(&self) -> Result<String> {
        Ok("Fake page".to_string())
    }

    fn close(&self) -> Result<()> {
        self.closed.set(self.closed.get() + 1);
        Ok(())
    }
}

/// Hands out freshly built fakes, one per opened session
pub(crate) struct FakeFactory<F: Fn() -> Result<FakeDom>> {
    build: F,
    pub opened: Cell<usize>,
}

impl<F: Fn() -> Result<FakeDom>> FakeFactory<F> {
    pub fn new(build: F) -> Self {
        Self { build, opened: Cell::new(0) }
    }
}

impl<F: Fn() -> Result<FakeDom>> SessionFactory for FakeFactory<F> {
    type Session = FakeDom;

    fn open(&self) -> Result<FakeDom> {
        self.opened.set(self.opened.get() + 1);
        (self.build)()
    }
}
