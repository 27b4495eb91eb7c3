//! Host window boundary.
//!
//! The navigator never touches the browser directly. Everything it needs from
//! the host (history entries, the current location, full page loads and
//! listener wiring) goes through [`HostWindow`]. A wasm binding implements it
//! over `web_sys::Window`; [`MemoryHistory`] implements it in memory for tests
//! and non-browser hosts.

use std::cell::{Cell, RefCell};

use crate::context::State;

/// Current address as reported by the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Path portion, e.g. `/users/42`
    pub pathname: String,
    /// Query portion including `?`, or empty
    pub search: String,
    /// Fragment including `#`, or empty
    pub hash: String,
    /// Scheme including `:`, e.g. `https:`
    pub protocol: String,
}

impl Location {
    /// Parses a root-relative URL (`/path?query#hash`) or a bare fragment (`#!/path`)
    pub fn parse(url: &str) -> Self {
        let (rest, hash) = match url.find('#') {
            Some(index) => (&url[..index], &url[index..]),
            None => (url, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(index) => (&rest[..index], &rest[index..]),
            None => (rest, ""),
        };

        Self {
            pathname: pathname.to_string(),
            search: search.to_string(),
            hash: hash.to_string(),
            protocol: "http:".to_string(),
        }
    }

    /// `pathname + search`
    pub fn path_and_query(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }

    /// `pathname + search + hash`
    pub fn full_path(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

/// Which host listeners the navigator wants bound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Listeners {
    /// Browser back/forward (`popstate`)
    pub popstate: bool,
    /// Same-origin link activation (`click`)
    pub click: bool,
}

/// Operations the navigator issues against its host
pub trait HostWindow {
    /// Creates a new history entry
    fn push_state(&self, state: &State, title: &str, url: &str);

    /// Overwrites the current history entry
    fn replace_state(&self, state: &State, title: &str, url: &str);

    /// Reads the current location
    fn location(&self) -> Location;

    /// Genuine history back-navigation
    fn back(&self);

    /// Full (non-SPA) navigation to `url`
    fn assign(&self, url: &str);

    /// Current document title
    fn title(&self) -> String {
        String::new()
    }

    /// Binds the requested listeners and releases the others
    fn bind_listeners(&self, _listeners: Listeners) {}

    /// Releases every listener
    fn unbind_listeners(&self) {}
}

/// One entry of [`MemoryHistory`]
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub state: State,
    pub title: String,
    pub url: String,
}

/// In-memory [`HostWindow`]
///
/// Keeps an entry stack with a cursor and a [`Location`] that follows pushes,
/// replaces and `back()`, and records full navigations and listener bindings.
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::host::{HostWindow, MemoryHistory};
/// use rhtmx_navigator::State;
///
/// let history = MemoryHistory::new("/");
/// history.push_state(&State::new("/about"), "", "/about");
/// assert_eq!(history.location().pathname, "/about");
///
/// history.back();
/// assert_eq!(history.location().pathname, "/");
/// ```
#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: RefCell<Vec<HistoryEntry>>,
    cursor: Cell<usize>,
    location: RefCell<Location>,
    title: RefCell<String>,
    assigned: RefCell<Vec<String>>,
    listeners: Cell<Listeners>,
    back_calls: Cell<usize>,
}

impl MemoryHistory {
    /// Creates a history whose single entry is `url`
    pub fn new(url: &str) -> Self {
        let history = Self::default();
        history.entries.borrow_mut().push(HistoryEntry {
            state: State::default(),
            title: String::new(),
            url: url.to_string(),
        });
        *history.location.borrow_mut() = Location::parse(url);
        history
    }

    /// Overrides the current location without touching the entry stack
    pub fn set_location(&self, location: Location) {
        *self.location.borrow_mut() = location;
    }

    /// Sets the document title reported to new contexts
    pub fn set_title(&self, title: impl Into<String>) {
        *self.title.borrow_mut() = title.into();
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.borrow().clone()
    }

    /// The entry under the cursor
    pub fn current_entry(&self) -> Option<HistoryEntry> {
        self.entries.borrow().get(self.cursor.get()).cloned()
    }

    /// URLs handed to [`HostWindow::assign`]
    pub fn assigned(&self) -> Vec<String> {
        self.assigned.borrow().clone()
    }

    /// Listeners currently bound
    pub fn listeners(&self) -> Listeners {
        self.listeners.get()
    }

    /// Number of [`HostWindow::back`] calls
    pub fn back_calls(&self) -> usize {
        self.back_calls.get()
    }

    fn follow(&self, url: &str) {
        let mut location = self.location.borrow_mut();
        let protocol = std::mem::take(&mut location.protocol);

        *location = if url.starts_with('#') {
            Location {
                hash: url.to_string(),
                ..location.clone()
            }
        } else {
            Location::parse(url)
        };
        location.protocol = protocol;
    }
}

impl HostWindow for MemoryHistory {
    fn push_state(&self, state: &State, title: &str, url: &str) {
        let mut entries = self.entries.borrow_mut();
        let cursor = self.cursor.get();
        entries.truncate(cursor + 1);
        entries.push(HistoryEntry {
            state: state.clone(),
            title: title.to_string(),
            url: url.to_string(),
        });
        self.cursor.set(entries.len() - 1);
        drop(entries);
        self.follow(url);
    }

    fn replace_state(&self, state: &State, title: &str, url: &str) {
        let entry = HistoryEntry {
            state: state.clone(),
            title: title.to_string(),
            url: url.to_string(),
        };
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(self.cursor.get()) {
            Some(current) => *current = entry,
            None => entries.push(entry),
        }
        drop(entries);
        self.follow(url);
    }

    fn location(&self) -> Location {
        self.location.borrow().clone()
    }

    fn back(&self) {
        self.back_calls.set(self.back_calls.get() + 1);
        let cursor = self.cursor.get();
        if cursor == 0 {
            return;
        }
        self.cursor.set(cursor - 1);
        if let Some(entry) = self.current_entry() {
            self.follow(&entry.url);
        }
    }

    fn assign(&self, url: &str) {
        self.assigned.borrow_mut().push(url.to_string());
        self.follow(url);
    }

    fn title(&self) -> String {
        self.title.borrow().clone()
    }

    fn bind_listeners(&self, listeners: Listeners) {
        self.listeners.set(listeners);
    }

    fn unbind_listeners(&self) {
        self.listeners.set(Listeners::default());
    }
}
