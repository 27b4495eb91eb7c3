//! Navigation controller
//!
//! [`Navigator`] owns the enter/exit middleware chains, the current path and
//! the count of history entries it pushed. `show`, `replace` and `back` build
//! a [`Context`], run a dispatch pass for it and write history through the
//! [`HostWindow`].
//!
//! ## Example
//!
//! ```
//! use rhtmx_navigator::{HostWindow, MemoryHistory, Navigator};
//! use std::rc::Rc;
//!
//! let host = Rc::new(MemoryHistory::new("/"));
//! let nav = Navigator::with_host(host.clone());
//!
//! nav.route("/user/:id", |ctx, _next| {
//!     assert_eq!(ctx.param("id").as_deref(), Some("42"));
//!     Ok(())
//! }).unwrap();
//!
//! nav.show("/user/42").unwrap();
//! assert_eq!(nav.current(), "/user/42");
//! assert_eq!(nav.history_len(), 1);
//! assert_eq!(host.location().pathname, "/user/42");
//! ```
//!
//! ## Deferred work
//!
//! `back()` fallbacks and redirects are queued instead of run inline, so the
//! call that scheduled them (and the dispatch pass it belongs to) finishes
//! first. The host drains the queue with [`Navigator::run_deferred`] once the
//! current event has been handled.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::config::{NavigatorConfig, Options};
use crate::context::{Context, ContextEnv, State};
use crate::dispatch::{self, HandlerResult, Middleware, Next};
use crate::error::{NavigationError, PatternError};
use crate::host::{HostWindow, Listeners, MemoryHistory};
use crate::pattern::PathSpec;
use crate::route::{Route, RouteOptions};

/// Work queued with [`Navigator::defer`]
pub type DeferredTask = Box<dyn FnOnce(&Navigator) -> Result<(), NavigationError>>;

/// Flags for [`Navigator::show_with`] and [`Navigator::replace_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Run a dispatch pass (default: true)
    pub dispatch: bool,
    /// Push a history entry after dispatch; `show` only (default: true)
    pub push: bool,
    /// Mark the context as the initial one; `replace` only (default: false)
    pub init: bool,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            dispatch: true,
            push: true,
            init: false,
        }
    }
}

struct Inner {
    host: Rc<dyn HostWindow>,
    callbacks: RefCell<Vec<Middleware>>,
    exits: RefCell<Vec<Middleware>>,
    current: RefCell<String>,
    len: Cell<usize>,
    prev_context: RefCell<Option<Context>>,
    base: RefCell<String>,
    strict: Cell<bool>,
    options: Cell<Options>,
    running: Cell<bool>,
    deferred: RefCell<VecDeque<DeferredTask>>,
}

/// Client-side navigation controller
///
/// Cloning is cheap and yields another handle to the same controller.
#[derive(Clone)]
pub struct Navigator {
    inner: Rc<Inner>,
}

/// Non-owning handle to a [`Navigator`], for handlers stored inside it
#[derive(Clone)]
pub struct WeakNavigator {
    inner: Weak<Inner>,
}

impl WeakNavigator {
    pub fn upgrade(&self) -> Option<Navigator> {
        self.inner.upgrade().map(|inner| Navigator { inner })
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current())
            .field("len", &self.history_len())
            .field("base", &self.base())
            .field("strict", &self.strict())
            .field("options", &self.options())
            .field("running", &self.is_running())
            .field("callbacks", &self.inner.callbacks.borrow().len())
            .field("exits", &self.inner.exits.borrow().len())
            .finish()
    }
}

impl Navigator {
    /// Navigator over an in-memory history starting at `/`
    pub fn new() -> Self {
        Self::with_host(Rc::new(MemoryHistory::new("/")))
    }

    /// Navigator over `host`
    pub fn with_host(host: Rc<dyn HostWindow>) -> Self {
        Self {
            inner: Rc::new(Inner {
                host,
                callbacks: RefCell::new(Vec::new()),
                exits: RefCell::new(Vec::new()),
                current: RefCell::new(String::new()),
                len: Cell::new(0),
                prev_context: RefCell::new(None),
                base: RefCell::new(String::new()),
                strict: Cell::new(false),
                options: Cell::new(Options::default()),
                running: Cell::new(false),
                deferred: RefCell::new(VecDeque::new()),
            }),
        }
    }

    /// Navigator over `host` with base, strictness and options from `config`
    pub fn from_config(host: Rc<dyn HostWindow>, config: &NavigatorConfig) -> Self {
        let navigator = Self::with_host(host);
        navigator.set_base(config.base.clone());
        navigator.set_strict(config.strict);
        navigator.inner.options.set(config.options);
        navigator
    }

    pub fn downgrade(&self) -> WeakNavigator {
        WeakNavigator {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn host(&self) -> Rc<dyn HostWindow> {
        Rc::clone(&self.inner.host)
    }

    pub fn options(&self) -> Options {
        self.inner.options.get()
    }

    /// Path of the most recent navigation (empty before the first one)
    pub fn current(&self) -> String {
        self.inner.current.borrow().clone()
    }

    /// History entries pushed by this navigator and not yet gone back over
    pub fn history_len(&self) -> usize {
        self.inner.len.get()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    pub fn base(&self) -> String {
        self.inner.base.borrow().clone()
    }

    pub fn set_base(&self, base: impl Into<String>) {
        *self.inner.base.borrow_mut() = base.into();
    }

    pub fn strict(&self) -> bool {
        self.inner.strict.get()
    }

    pub fn set_strict(&self, strict: bool) {
        self.inner.strict.set(strict);
    }

    /// Base path in effect
    ///
    /// Pages opened from `file:` in hashbang mode use their own pathname.
    pub fn effective_base(&self) -> String {
        let base = self.base();
        if !base.is_empty() || !self.options().hashbang {
            return base;
        }

        let location = self.inner.host.location();
        if location.protocol == "file:" {
            location.pathname
        } else {
            base
        }
    }

    // ===== Lifecycle =====

    /// Stores `options` and asks the host to bind the matching listeners
    pub fn configure(&self, options: Options) {
        self.inner.options.set(options);
        self.inner.host.bind_listeners(Listeners {
            popstate: options.popstate,
            click: options.click,
        });
    }

    /// Configures the navigator and dispatches the host's current location
    pub fn start(&self, options: Options) -> Result<(), NavigationError> {
        self.configure(options);
        if !options.dispatch {
            return Ok(());
        }
        self.inner.running.set(true);

        let location = self.inner.host.location();
        let url = if options.hashbang {
            match location.hash.strip_prefix("#!") {
                Some(path) => format!("{}{}", path, location.search),
                None => format!("{}{}", location.search, location.hash),
            }
        } else {
            location.full_path()
        };

        debug!(%url, "starting navigator");
        self.replace_with(
            &url,
            None,
            NavigateOptions {
                init: true,
                ..NavigateOptions::default()
            },
        )?;
        Ok(())
    }

    /// Resets navigation state and releases the host listeners
    pub fn stop(&self) {
        if !self.inner.running.get() {
            return;
        }
        debug!("stopping navigator");
        self.inner.current.borrow_mut().clear();
        self.inner.len.set(0);
        self.inner.running.set(false);
        self.inner.host.unbind_listeners();
    }

    // ===== Registration =====

    /// Registers `handler` for entering `path`
    pub fn route<F>(&self, path: impl Into<PathSpec>, handler: F) -> Result<(), PatternError>
    where
        F: Fn(&Context, Next) -> HandlerResult + 'static,
    {
        self.route_chain(path, vec![dispatch::handler(handler)])
    }

    /// Registers `handler` for entering `path` with explicit route options
    pub fn route_with<F>(
        &self,
        path: impl Into<PathSpec>,
        options: RouteOptions,
        handler: F,
    ) -> Result<(), PatternError>
    where
        F: Fn(&Context, Next) -> HandlerResult + 'static,
    {
        let route = self.compile_route(path, options)?;
        self.inner
            .callbacks
            .borrow_mut()
            .push(route.middleware(dispatch::handler(handler)));
        Ok(())
    }

    /// Registers several handlers, in order, under one compiled route
    pub fn route_chain(
        &self,
        path: impl Into<PathSpec>,
        handlers: impl IntoIterator<Item = Middleware>,
    ) -> Result<(), PatternError> {
        let route = self.compile_route(path, RouteOptions::default())?;
        self.inner
            .callbacks
            .borrow_mut()
            .extend(handlers.into_iter().map(|h| route.middleware(h)));
        Ok(())
    }

    /// Registers a catch-all enter handler
    pub fn fallback<F>(&self, handler: F) -> Result<(), PatternError>
    where
        F: Fn(&Context, Next) -> HandlerResult + 'static,
    {
        self.route("*", handler)
    }

    /// Registers `handler` for leaving `path`
    pub fn exit<F>(&self, path: impl Into<PathSpec>, handler: F) -> Result<(), PatternError>
    where
        F: Fn(&Context, Next) -> HandlerResult + 'static,
    {
        self.exit_chain(path, vec![dispatch::handler(handler)])
    }

    /// Registers several exit handlers, in order, under one compiled route
    pub fn exit_chain(
        &self,
        path: impl Into<PathSpec>,
        handlers: impl IntoIterator<Item = Middleware>,
    ) -> Result<(), PatternError> {
        let route = self.compile_route(path, RouteOptions::default())?;
        self.inner
            .exits
            .borrow_mut()
            .extend(handlers.into_iter().map(|h| route.middleware(h)));
        Ok(())
    }

    /// Registers an exit handler for every path
    pub fn exit_any<F>(&self, handler: F) -> Result<(), PatternError>
    where
        F: Fn(&Context, Next) -> HandlerResult + 'static,
    {
        self.exit("*", handler)
    }

    /// Sends `from` to `to` with a deferred `replace`
    pub fn redirect(
        &self,
        from: impl Into<PathSpec>,
        to: impl Into<String>,
    ) -> Result<(), PatternError> {
        let to = to.into();
        let navigator = self.downgrade();
        self.route(from, move |_ctx, _next| {
            if let Some(navigator) = navigator.upgrade() {
                navigator.redirect_to(to.clone());
            }
            Ok(())
        })
    }

    /// Schedules `replace(to)` on the deferred queue
    pub fn redirect_to(&self, to: impl Into<String>) {
        let to = to.into();
        debug!(%to, "redirect scheduled");
        self.defer(move |navigator| navigator.replace(&to).map(|_| ()));
    }

    fn compile_route(
        &self,
        path: impl Into<PathSpec>,
        options: RouteOptions,
    ) -> Result<Rc<Route>, PatternError> {
        let options = RouteOptions {
            strict: options.strict || self.strict(),
            ..options
        };
        Ok(Rc::new(Route::new(path, options)?))
    }

    // ===== Navigation =====

    /// Builds a context for `path` against the current settings
    pub fn context(&self, path: &str, state: Option<State>) -> Context {
        let options = self.options();
        Context::new(
            path,
            state,
            &ContextEnv {
                base: self.effective_base(),
                hashbang: options.hashbang,
                decode_components: options.decode_url_components,
                title: self.inner.host.title(),
            },
        )
    }

    /// Navigates to `path` and pushes a history entry
    pub fn show(&self, path: &str) -> Result<Context, NavigationError> {
        self.show_with(path, None, NavigateOptions::default())
    }

    /// Navigates to `path`
    ///
    /// The history entry is pushed after dispatch, and skipped when the
    /// context ended up not handled or a newer navigation took over.
    pub fn show_with(
        &self,
        path: &str,
        state: Option<State>,
        options: NavigateOptions,
    ) -> Result<Context, NavigationError> {
        debug!(path, "show");
        let ctx = self.context(path, state);
        let prev = self.begin(&ctx);

        if options.dispatch {
            self.dispatch(&ctx, prev)?;
        }

        let superseded = ctx.path() != self.current();
        if options.push && ctx.handled() != Some(false) && !superseded {
            ctx.persist_pushing(self.inner.host.as_ref(), &self.inner.len);
        }

        Ok(ctx)
    }

    /// Navigates to `path`, overwriting the current history entry
    pub fn replace(&self, path: &str) -> Result<Context, NavigationError> {
        self.replace_with(path, None, NavigateOptions::default())
    }

    /// Navigates to `path`, overwriting the current history entry
    ///
    /// The entry is written before dispatch, so a handler that navigates again
    /// overwrites or pushes on top of this context rather than a stale one.
    pub fn replace_with(
        &self,
        path: &str,
        state: Option<State>,
        options: NavigateOptions,
    ) -> Result<Context, NavigationError> {
        debug!(path, init = options.init, "replace");
        let ctx = self.context(path, state);
        let prev = self.begin(&ctx);
        ctx.set_init(options.init);
        ctx.persist_replacing(self.inner.host.as_ref());

        if options.dispatch {
            self.dispatch(&ctx, prev)?;
        }

        Ok(ctx)
    }

    /// Goes back one entry, or shows `fallback` when nothing was pushed
    ///
    /// Without pushed entries the fallback (or the base path when `fallback`
    /// is `None` or empty) is shown from the deferred queue.
    pub fn back(&self, fallback: Option<&str>, state: Option<State>) {
        let len = self.inner.len.get();
        if len > 0 {
            debug!(len, "back");
            self.inner.host.back();
            self.inner.len.set(len - 1);
            return;
        }

        let target = match fallback {
            Some(path) if !path.is_empty() => path.to_string(),
            _ => self.effective_base(),
        };
        debug!(%target, "back with empty history, falling back");
        self.defer(move |navigator| {
            navigator
                .show_with(&target, state, NavigateOptions::default())
                .map(|_| ())
        });
    }

    /// Handles a browser back/forward event
    pub fn pop_state(&self, state: Option<State>) -> Result<Context, NavigationError> {
        match state {
            Some(state) => {
                let path = state.path.clone();
                self.replace_with(&path, Some(state), NavigateOptions::default())
            }
            None => {
                let location = self.inner.host.location();
                self.show_with(
                    &location.full_path(),
                    None,
                    NavigateOptions {
                        push: false,
                        ..NavigateOptions::default()
                    },
                )
            }
        }
    }

    /// Writes `ctx` (and its state) to the current history entry
    pub fn save(&self, ctx: &Context) {
        ctx.persist_replacing(self.inner.host.as_ref());
    }

    /// Runs one dispatch pass for `ctx`, exiting `prev` first
    pub fn dispatch(&self, ctx: &Context, prev: Option<Context>) -> Result<(), NavigationError> {
        dispatch::run(self, ctx, prev)
    }

    /// Records `ctx` as current; returns the context it replaces
    fn begin(&self, ctx: &Context) -> Option<Context> {
        *self.inner.current.borrow_mut() = ctx.path();
        self.inner.prev_context.replace(Some(ctx.clone()))
    }

    // ===== Deferred queue =====

    /// Queues `task` to run after the current navigation
    pub fn defer<F>(&self, task: F)
    where
        F: FnOnce(&Navigator) -> Result<(), NavigationError> + 'static,
    {
        self.inner.deferred.borrow_mut().push_back(Box::new(task));
    }

    pub fn has_deferred(&self) -> bool {
        !self.inner.deferred.borrow().is_empty()
    }

    /// Runs queued tasks, including ones they queue, until the queue is empty
    ///
    /// Stops at the first failing task; later tasks stay queued.
    pub fn run_deferred(&self) -> Result<usize, NavigationError> {
        let mut ran = 0;
        loop {
            let Some(task) = self.inner.deferred.borrow_mut().pop_front() else {
                return Ok(ran);
            };
            task(self)?;
            ran += 1;
        }
    }

    // ===== Dispatch support =====

    pub(crate) fn callback_at(&self, index: usize) -> Option<Middleware> {
        self.inner.callbacks.borrow().get(index).cloned()
    }

    pub(crate) fn exit_at(&self, index: usize) -> Option<Middleware> {
        self.inner.exits.borrow().get(index).cloned()
    }
}
