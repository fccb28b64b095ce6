use crate::{browser::{NodeRef, Query, RemoteDom, SessionFactory, config::LaunchOptions},
            error::{MonitorError, Result}};
use headless_chrome::{Browser, Element, Tab,
                      protocol::cdp::{DOM, Runtime}};
use serde_json::Value;
use std::{cell::RefCell, collections::HashMap, ffi::OsStr, sync::Arc, time::Duration};

const IS_VISIBLE_JS: &str = r#"
    function() {
        const rect = this.getBoundingClientRect();
        const style = window.getComputedStyle(this);
        return rect.width > 0 && rect.height > 0
            && style.visibility !== 'hidden' && style.display !== 'none';
    }
"#;

// Dispatched as an event so icon elements without a click() method still respond
const CLICK_JS: &str = r#"
    function() {
        this.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window }));
        return true;
    }
"#;

const CLEAR_JS: &str = r#"
    function() {
        this.focus();
        this.value = '';
        this.dispatchEvent(new Event('input', { bubbles: true }));
        return true;
    }
"#;

const ATTRIBUTE_JS: &str = "function(name) { return this.getAttribute(name); }";

const TEXT_JS: &str = "function() { return this.innerText; }";

const FOCUS_JS: &str = "function() { this.focus(); return true; }";

const FIND_IN_JS: &str = "function(selector) { return Array.from(this.querySelectorAll(selector)); }";

fn transport(context: &str, e: impl std::fmt::Display) -> MonitorError {
    MonitorError::Transport(format!("{}: {}", context, e))
}

/// Script that collects every match of `query` into an array
fn collect_script(query: &Query) -> String {
    match query {
        Query::Css(selector) => {
            format!("Array.from(document.querySelectorAll({}))", Value::from(selector.as_str()))
        }
        Query::XPath(expression) => format!(
            "(() => {{ const found = document.evaluate({}, document, null, \
             XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
             return Array.from({{ length: found.snapshotLength }}, (_, i) => found.snapshotItem(i)); }})()",
            Value::from(expression.as_str())
        ),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Handle {
    backend_node_id: u32,
    object_id: String,
}

/// Element handles for the current document.
///
/// A node found twice keeps its handle, with the newest remote object.
/// Handles are never reused, so one taken before a navigation is reported
/// as stale instead of pointing at an unrelated element.
#[derive(Debug, Default)]
struct HandleTable {
    handles: HashMap<NodeRef, Handle>,
    by_backend_id: HashMap<u32, NodeRef>,
    next: u32,
}

impl HandleTable {
    fn register(&mut self, backend_node_id: u32, object_id: String) -> NodeRef {
        if let Some(&node) = self.by_backend_id.get(&backend_node_id) {
            if let Some(handle) = self.handles.get_mut(&node) {
                handle.object_id = object_id;
            }
            return node;
        }

        let node = NodeRef(self.next);
        self.next += 1;
        self.handles.insert(node, Handle { backend_node_id, object_id });
        self.by_backend_id.insert(backend_node_id, node);
        node
    }

    fn get(&self, node: NodeRef) -> Option<&Handle> {
        self.handles.get(&node)
    }

    fn invalidate(&mut self) {
        self.handles.clear();
        self.by_backend_id.clear();
    }
}

/// Browser session that drives one Chrome/Chromium tab
pub struct BrowserSession {
    /// Kept alive for the lifetime of the session; the process exits when dropped
    _browser: Browser,

    tab: Arc<Tab>,

    handles: RefCell<HandleTable>,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Ignore default arguments to prevent detection by anti-bot services
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));
        launch_opts.args.push(OsStr::new("--disable-dev-shm-usage"));
        launch_opts.args.push(OsStr::new("--disable-gpu"));

        // A cycle may spend minutes on detail pages; the default idle timeout is 30 seconds
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));

        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }

        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| MonitorError::LaunchFailed(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| MonitorError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self { _browser: browser, tab, handles: RefCell::new(HandleTable::default()) })
    }

    /// Rebuild the element behind a handle from its stable identifiers
    fn element(&self, node: NodeRef) -> Result<Element<'_>> {
        let handles = self.handles.borrow();
        let handle = handles
            .get(node)
            .ok_or_else(|| MonitorError::Transport(format!("Stale element handle {:?}", node)))?;

        Ok(Element {
            remote_object_id: handle.object_id.clone(),
            backend_node_id: handle.backend_node_id,
            node_id: 0,
            parent: &self.tab,
            attributes: None,
            tag_name: String::new(),
            value: String::new(),
        })
    }

    fn call_on(&self, node: NodeRef, function: &str, args: Vec<Value>) -> Result<Runtime::RemoteObject> {
        self.element(node)?
            .call_js_fn(function, args, false)
            .map_err(|e| transport("Element script failed", e))
    }

    fn value_of(&self, node: NodeRef, function: &str, args: Vec<Value>) -> Result<Value> {
        Ok(self.call_on(node, function, args)?.value.unwrap_or(Value::Null))
    }

    /// Register every element of a remote array, in index order
    fn register_all(&self, array: Runtime::RemoteObject) -> Result<Vec<NodeRef>> {
        let Some(array_id) = array.object_id else {
            return Ok(Vec::new());
        };

        let properties = self
            .tab
            .call_method(Runtime::GetProperties {
                object_id: array_id,
                own_properties: Some(true),
                accessor_properties_only: None,
                generate_preview: None,
                non_indexed_properties_only: None,
            })
            .map_err(|e| transport("Failed to read query results", e))?
            .result;

        let mut elements: Vec<(usize, String)> = properties
            .into_iter()
            .filter_map(|p| Some((p.name.parse().ok()?, p.value?.object_id?)))
            .collect();
        elements.sort_by_key(|(index, _)| *index);

        let mut nodes = Vec::with_capacity(elements.len());
        for (_, object_id) in elements {
            let described = self
                .tab
                .call_method(DOM::DescribeNode {
                    node_id: None,
                    backend_node_id: None,
                    object_id: Some(object_id.clone()),
                    depth: None,
                    pierce: None,
                })
                .map_err(|e| transport("Failed to describe element", e))?;

            nodes.push(self.handles.borrow_mut().register(described.node.backend_node_id, object_id));
        }

        Ok(nodes)
    }
}

impl RemoteDom for BrowserSession {
    fn navigate(&self, url: &str) -> Result<()> {
        self.handles.borrow_mut().invalidate();

        self.tab
            .navigate_to(url)
            .map_err(|e| transport(&format!("Failed to navigate to {}", url), e))?
            .wait_until_navigated()
            .map_err(|e| transport("Navigation timeout", e))?;

        Ok(())
    }

    fn find(&self, query: &Query) -> Result<Vec<NodeRef>> {
        let array = self
            .tab
            .evaluate(&collect_script(query), false)
            .map_err(|e| transport(&format!("Query {} failed", query), e))?;

        self.register_all(array)
    }

    fn find_in(&self, scope: NodeRef, css: &str) -> Result<Vec<NodeRef>> {
        let array = self
            .call_on(scope, FIND_IN_JS, vec![Value::from(css)])
            .map_err(|e| transport(&format!("Scoped query '{}' failed", css), e))?;

        self.register_all(array)
    }

    fn text(&self, node: NodeRef) -> Result<String> {
        let value = self.value_of(node, TEXT_JS, Vec::new())?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn attribute(&self, node: NodeRef, name: &str) -> Result<Option<String>> {
        let value = self.value_of(node, ATTRIBUTE_JS, vec![Value::from(name)])?;
        Ok(value.as_str().map(str::to_string))
    }

    fn is_visible(&self, node: NodeRef) -> Result<bool> {
        Ok(self.value_of(node, IS_VISIBLE_JS, Vec::new())?.as_bool().unwrap_or(false))
    }

    fn click(&self, node: NodeRef) -> Result<()> {
        self.call_on(node, CLICK_JS, Vec::new())?;
        Ok(())
    }

    fn clear(&self, node: NodeRef) -> Result<()> {
        self.call_on(node, CLEAR_JS, Vec::new())?;
        Ok(())
    }

    fn type_into(&self, node: NodeRef, text: &str) -> Result<()> {
        self.call_on(node, FOCUS_JS, Vec::new())?;
        self.tab
            .type_str(text)
            .map_err(|e| transport("Failed to type into element", e))?;
        Ok(())
    }

    fn press_enter(&self, node: NodeRef) -> Result<()> {
        self.call_on(node, FOCUS_JS, Vec::new())?;
        self.tab
            .press_key("Enter")
            .map_err(|e| transport("Failed to press Enter", e))?;
        Ok(())
    }

    fn execute(&self, script: &str) -> Result<Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| transport("Script execution failed", e))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    fn title(&self) -> Result<String> {
        self.tab.get_title().map_err(|e| transport("Failed to read page title", e))
    }

    fn close(&self) -> Result<()> {
        // The browser process itself is terminated when `Browser` is dropped
        self.tab
            .close(true)
            .map_err(|e| transport("Failed to close tab", e))?;
        Ok(())
    }
}

/// Launches a fresh headless Chrome for every cycle
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    options: LaunchOptions,
}

impl ChromeLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

impl SessionFactory for ChromeLauncher {
    type Session = BrowserSession;

    fn open(&self) -> Result<BrowserSession> {
        log::debug!("Launching browser (headless: {})", self.options.headless);
        BrowserSession::launch(self.options.clone())
    }
}
