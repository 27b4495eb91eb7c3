//! Navigation context
//!
//! A [`Context`] describes one navigation request: the canonical path written to
//! history, the logical path routes match against, its query string and hash,
//! the params filled in by the matching route, and the associated [`State`].
//!
//! Contexts are cheap handles (`Rc<RefCell<..>>`). The dispatch pass that owns a
//! context and the handlers it calls share the same instance, so params and
//! state written by one middleware are visible to the next.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::decode::decode_url_component;
use crate::host::HostWindow;

/// History state persisted alongside each entry
///
/// `path` always holds the canonical path of the context that wrote it; any
/// other fields are application data carried through history.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::State;
///
/// let state = State::new("/users/7").with("scroll", 120);
/// let json = serde_json::to_value(&state).unwrap();
/// assert_eq!(json["path"], "/users/7");
/// assert_eq!(json["scroll"], 120);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub path: String,

    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl State {
    /// State pointing at `path` with no extra data
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: Map::new(),
        }
    }

    /// Adds an application field (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Reads an application field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Controller settings a context is built against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextEnv {
    /// Base path prefix
    pub base: String,
    /// `#!` URL mode
    pub hashbang: bool,
    /// Percent/`+` decoding of query, hash and params
    pub decode_components: bool,
    /// Document title at construction time
    pub title: String,
}

#[derive(Debug)]
struct ContextInner {
    canonical_path: String,
    path: String,
    pathname: String,
    querystring: String,
    hash: String,
    title: String,
    state: State,
    params: HashMap<String, String>,
    handled: Option<bool>,
    provisional: bool,
    init: bool,
    route_path: Option<String>,
    hashbang: bool,
    decode_components: bool,
}

/// One navigation request
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::{Context, ContextEnv};
///
/// let env = ContextEnv { base: "/app".into(), decode_components: true, ..Default::default() };
/// let ctx = Context::new("/users?sort=name+asc#top", None, &env);
///
/// assert_eq!(ctx.canonical_path(), "/app/users?sort=name+asc#top");
/// assert_eq!(ctx.path(), "/users?sort=name+asc");
/// assert_eq!(ctx.pathname(), "/users");
/// assert_eq!(ctx.querystring(), "sort=name asc");
/// assert_eq!(ctx.hash(), "top");
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    inner: Rc<RefCell<ContextInner>>,
}

impl Context {
    /// Builds a context for `path`
    ///
    /// A root-relative `path` that does not already carry the base is prefixed
    /// with it (and with `#!` in hashbang mode) to form the canonical path. The
    /// logical path is the canonical path without base and `#!`, or `/` when
    /// nothing is left.
    pub fn new(path: &str, state: Option<State>, env: &ContextEnv) -> Self {
        let canonical_path = if path.starts_with('/') && !path.starts_with(env.base.as_str()) {
            format!(
                "{}{}{}",
                env.base,
                if env.hashbang { "#!" } else { "" },
                path
            )
        } else {
            path.to_string()
        };

        let mut logical = canonical_path
            .strip_prefix(env.base.as_str())
            .unwrap_or(canonical_path.as_str())
            .to_string();
        if env.hashbang {
            logical = logical.replacen("#!", "", 1);
        }
        if logical.is_empty() {
            logical = "/".to_string();
        }

        let decode = |raw: &str| decode_url_component(raw, env.decode_components).into_owned();

        let (mut path, hash) = match logical.split_once('#') {
            Some((before, after)) if !env.hashbang => {
                let fragment = after.split('#').next().unwrap_or_default();
                (before.to_string(), decode(fragment))
            }
            _ => (logical.clone(), String::new()),
        };
        if path.is_empty() {
            path = "/".to_string();
        }

        let (pathname, querystring) = match path.split_once('?') {
            Some((before, query)) => (decode(before), decode(query)),
            None => (decode(path.as_str()), String::new()),
        };

        let mut state = state.unwrap_or_default();
        state.path = canonical_path.clone();

        Self {
            inner: Rc::new(RefCell::new(ContextInner {
                canonical_path,
                path,
                pathname,
                querystring,
                hash,
                title: env.title.clone(),
                state,
                params: HashMap::new(),
                handled: None,
                provisional: false,
                init: false,
                route_path: None,
                hashbang: env.hashbang,
                decode_components: env.decode_components,
            })),
        }
    }

    /// Base-prefixed path as written to history
    pub fn canonical_path(&self) -> String {
        self.inner.borrow().canonical_path.clone()
    }

    /// Logical path (base and `#!` removed), query string included
    pub fn path(&self) -> String {
        self.inner.borrow().path.clone()
    }

    /// Decoded logical path before `?`
    pub fn pathname(&self) -> String {
        self.inner.borrow().pathname.clone()
    }

    /// Decoded query string without the leading `?`
    pub fn querystring(&self) -> String {
        self.inner.borrow().querystring.clone()
    }

    /// Decoded fragment without the leading `#` (empty in hashbang mode)
    pub fn hash(&self) -> String {
        self.inner.borrow().hash.clone()
    }

    /// Document title captured when the context was built
    pub fn title(&self) -> String {
        self.inner.borrow().title.clone()
    }

    /// Snapshot of the associated state
    pub fn state(&self) -> State {
        self.inner.borrow().state.clone()
    }

    /// Stores an application field in the associated state
    ///
    /// Call [`Navigator::save`](crate::Navigator::save) to write it to the current history entry.
    pub fn set_state_value(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .borrow_mut()
            .state
            .data
            .insert(key.into(), value.into());
    }

    /// Snapshot of the extracted params
    pub fn params(&self) -> HashMap<String, String> {
        self.inner.borrow().params.clone()
    }

    /// One extracted param
    pub fn param(&self, name: &str) -> Option<String> {
        self.inner.borrow().params.get(name).cloned()
    }

    /// `None` until a route handles the context; `Some(false)` when dispatch fell through
    pub fn handled(&self) -> Option<bool> {
        self.inner.borrow().handled
    }

    /// Marks the context handled (or not)
    pub fn set_handled(&self, handled: bool) {
        let mut inner = self.inner.borrow_mut();
        inner.handled = Some(handled);
        inner.provisional = false;
    }

    /// Whether this context was created by `Navigator::start`
    pub fn is_init(&self) -> bool {
        self.inner.borrow().init
    }

    /// Source of the pattern that matched last
    pub fn route_path(&self) -> Option<String> {
        self.inner.borrow().route_path.clone()
    }

    /// Whether `self` and `other` are the same context instance
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn decode_components(&self) -> bool {
        self.inner.borrow().decode_components
    }

    pub(crate) fn set_init(&self, init: bool) {
        self.inner.borrow_mut().init = init;
    }

    /// Runs `f` against the params map
    pub(crate) fn with_params<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> R {
        f(&mut self.inner.borrow_mut().params)
    }

    /// A route matched and is about to run its handler
    ///
    /// The context counts as handled unless the handler hands control to the
    /// next middleware, in which case [`Context::release_provisional`] undoes it.
    pub(crate) fn mark_matched(&self, route_path: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.route_path = Some(route_path.to_string());
        if inner.handled.is_none() || inner.provisional {
            inner.handled = Some(true);
            inner.provisional = true;
        }
    }

    pub(crate) fn release_provisional(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.provisional {
            inner.handled = None;
            inner.provisional = false;
        }
    }

    /// URL written to history for this context
    fn persisted_url(&self) -> String {
        let inner = self.inner.borrow();
        if inner.hashbang && inner.path != "/" {
            format!("#!{}", inner.path)
        } else {
            inner.canonical_path.clone()
        }
    }

    /// Overwrites the current history entry with this context
    pub(crate) fn persist_replacing(&self, host: &dyn HostWindow) {
        let url = self.persisted_url();
        let (state, title) = {
            let inner = self.inner.borrow();
            (inner.state.clone(), inner.title.clone())
        };
        host.replace_state(&state, &title, &url);
    }

    /// Creates a new history entry for this context and counts it in `len`
    pub(crate) fn persist_pushing(&self, host: &dyn HostWindow, len: &Cell<usize>) {
        let url = self.persisted_url();
        let (state, title) = {
            let inner = self.inner.borrow();
            (inner.state.clone(), inner.title.clone())
        };
        len.set(len.get() + 1);
        host.push_state(&state, &title, &url);
    }
}
