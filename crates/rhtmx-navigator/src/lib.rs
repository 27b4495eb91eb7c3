//! # RHTMX Navigator
//!
//! Client-side navigation with express-style route patterns:
//! - Static routes (`/about`)
//! - Named parameters (`/users/:id`), optional (`/posts/:id?`) and repeating (`/files/:path*`)
//! - Custom sub-patterns (`/post/:id(\d+)`), unnamed groups and the `*` catch-all
//! - Enter and exit middleware chains with cooperative `next` continuations
//! - History-driven `show` / `replace` / `back`, hashbang URLs and a base path
//!
//! ## Dispatch
//!
//! Every navigation builds a [`Context`] and runs one dispatch pass: the exit
//! chain against the previous context, then the enter chain against the new
//! one. A middleware continues the pass by calling [`Next::call`]. A pass
//! that finds no handler falls back to a full page load through the host.
//!
//! Redirects issued from inside a handler are safe: each enter step first
//! checks that its context is still the current navigation.
//!
//! ## Host
//!
//! History entries, the current location and full page loads go through the
//! [`HostWindow`] trait. [`MemoryHistory`] keeps all of it in memory.
//!
//! ## Example
//!
//! ```
//! use rhtmx_navigator::Navigator;
//!
//! let nav = Navigator::new();
//!
//! nav.route("/users/:id", |ctx, next| {
//!     // load the user, then let later handlers render
//!     assert_eq!(ctx.param("id").as_deref(), Some("7"));
//!     next.call()?;
//!     Ok(())
//! }).unwrap();
//! nav.route("/users/:id", |_ctx, _next| Ok(())).unwrap();
//!
//! let ctx = nav.show("/users/7").unwrap();
//! assert_eq!(ctx.handled(), Some(true));
//! ```

pub mod config;
pub mod context;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod navigator;
pub mod pattern;
pub mod route;

pub use config::{NavigatorConfig, Options};
pub use context::{Context, ContextEnv, State};
pub use dispatch::{handler, HandlerResult, Middleware, Next};
pub use error::{NavigationError, PatternError};
pub use host::{HostWindow, Listeners, Location, MemoryHistory};
pub use navigator::{NavigateOptions, Navigator, WeakNavigator};
pub use pattern::{compile, parse, PathParams, PathSpec, Pattern, PatternOptions};
pub use route::{Route, RouteOptions};
