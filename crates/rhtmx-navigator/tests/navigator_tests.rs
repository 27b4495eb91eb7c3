//! Integration tests for navigation and dispatch
//!
//! Tests are organized by feature area:
//! - Enter chain ordering and continuations
//! - Exit-before-enter ordering
//! - Redirects and stale dispatch passes
//! - Unhandled paths
//! - Back navigation and the deferred queue
//! - Base path and hashbang URLs

use pretty_assertions::assert_eq;
use rhtmx_navigator::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn setup() -> (Rc<MemoryHistory>, Navigator, Log) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();

    let host = Rc::new(MemoryHistory::new("/"));
    let navigator = Navigator::with_host(host.clone());
    (host, navigator, Rc::new(RefCell::new(Vec::new())))
}

/// Handler that records `label` and optionally continues
fn record(log: &Log, label: &str, continue_chain: bool) -> Middleware {
    let log = Rc::clone(log);
    let label = label.to_string();
    handler(move |_ctx, next| {
        log.borrow_mut().push(label.clone());
        if continue_chain {
            next.call()?;
        }
        Ok(())
    })
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

// ============================================================================
// Enter chain
// ============================================================================

#[test]
fn test_dispatch_order_stops_without_continuation() {
    let (_host, nav, log) = setup();
    nav.route_chain("/admin/*", vec![record(&log, "r1", true)]).unwrap();
    nav.route_chain("/users/:id", vec![record(&log, "r2", false)]).unwrap();
    nav.route_chain("/users/*", vec![record(&log, "r3", false)]).unwrap();

    nav.show("/users/5").unwrap();
    assert_eq!(entries(&log), vec!["r2"]);
}

#[test]
fn test_dispatch_order_with_continuation() {
    let (_host, nav, log) = setup();
    nav.route_chain("/admin/*", vec![record(&log, "r1", true)]).unwrap();
    nav.route_chain("/users/:id", vec![record(&log, "r2", true)]).unwrap();
    nav.route_chain("/users/*", vec![record(&log, "r3", false)]).unwrap();

    let ctx = nav.show("/users/5").unwrap();
    assert_eq!(entries(&log), vec!["r2", "r3"]);
    assert_eq!(ctx.handled(), Some(true));
    assert_eq!(ctx.route_path().as_deref(), Some("/users/*"));
}

#[test]
fn test_route_chain_shares_params() {
    let (_host, nav, _log) = setup();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let first = Rc::clone(&seen);
    let second = Rc::clone(&seen);
    nav.route_chain(
        "/users/:id",
        vec![
            handler(move |ctx, next| {
                first.borrow_mut().push(ctx.param("id").unwrap_or_default());
                ctx.set_state_value("loaded", true);
                next.call()?;
                Ok(())
            }),
            handler(move |ctx, _next| {
                let loaded = ctx.state().get("loaded").cloned().unwrap_or_default();
                second
                    .borrow_mut()
                    .push(format!("{}:{}", ctx.param("id").unwrap_or_default(), loaded));
                Ok(())
            }),
        ],
    )
    .unwrap();

    nav.show("/users/9").unwrap();
    assert_eq!(*seen.borrow(), vec!["9", "9:true"]);
}

#[test]
fn test_outer_param_survives_inner_route() {
    let (_host, nav, _log) = setup();
    let seen = Rc::new(RefCell::new(None));

    nav.route("/posts/:id", |_ctx, next| {
        next.call()?;
        Ok(())
    })
    .unwrap();
    // `id` does not participate when the second alternative matches
    let sink = Rc::clone(&seen);
    nav.route(vec!["/posts/:id(new)", "/posts/:n"], move |ctx, _next| {
        *sink.borrow_mut() = Some((ctx.param("id"), ctx.param("n")));
        Ok(())
    })
    .unwrap();

    nav.show("/posts/3").unwrap();
    assert_eq!(
        *seen.borrow(),
        Some((Some("3".to_string()), Some("3".to_string())))
    );
}

#[test]
fn test_handler_error_propagates_to_show() {
    let (_host, nav, log) = setup();
    nav.route("/broken", |_ctx, _next| anyhow::bail!("failed to load"))
        .unwrap();
    nav.route_chain("/broken", vec![record(&log, "after", false)]).unwrap();

    let err = nav.show("/broken").unwrap_err();
    assert_eq!(err.to_string(), "navigation handler failed: failed to load");
    assert!(entries(&log).is_empty());
}

#[test]
fn test_asynchronous_continuation() {
    let (host, nav, log) = setup();
    let parked: Rc<RefCell<Option<Next>>> = Rc::new(RefCell::new(None));

    let slot = Rc::clone(&parked);
    nav.route("/report", move |_ctx, next| {
        // Resumed later, as a timer callback would
        *slot.borrow_mut() = Some(next);
        Ok(())
    })
    .unwrap();
    nav.route_chain("/report", vec![record(&log, "render", false)]).unwrap();

    nav.show("/report").unwrap();
    assert!(entries(&log).is_empty());
    assert_eq!(host.location().pathname, "/report");

    let next = parked.borrow_mut().take().unwrap();
    next.call().unwrap();
    assert_eq!(entries(&log), vec!["render"]);
}

// ============================================================================
// Exit chain
// ============================================================================

#[test]
fn test_exit_runs_before_enter() {
    let (_host, nav, log) = setup();
    nav.exit_chain("/a", vec![record(&log, "exit a", true)]).unwrap();
    nav.route_chain("/a", vec![record(&log, "enter a", false)]).unwrap();
    nav.route_chain("/b", vec![record(&log, "enter b", false)]).unwrap();

    nav.show("/a").unwrap();
    nav.show("/b").unwrap();

    assert_eq!(entries(&log), vec!["enter a", "exit a", "enter b"]);
}

#[test]
fn test_exit_without_continuation_halts_dispatch() {
    let (_host, nav, log) = setup();
    nav.exit_chain("/a", vec![record(&log, "exit a", false)]).unwrap();
    nav.exit_any(|_ctx, next| {
        next.call()?;
        Ok(())
    })
    .unwrap();
    nav.route_chain("/a", vec![record(&log, "enter a", false)]).unwrap();
    nav.route_chain("/b", vec![record(&log, "enter b", false)]).unwrap();

    nav.show("/a").unwrap();
    nav.show("/b").unwrap();

    assert_eq!(entries(&log), vec!["enter a", "exit a"]);
}

#[test]
fn test_exit_sees_previous_context() {
    let (_host, nav, _log) = setup();
    let left = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&left);

    nav.exit("/users/:id", move |ctx, next| {
        *sink.borrow_mut() = ctx.param("id").unwrap_or_default();
        next.call()?;
        Ok(())
    })
    .unwrap();
    nav.fallback(|_ctx, _next| Ok(())).unwrap();

    nav.show("/users/4").unwrap();
    nav.show("/home").unwrap();
    assert_eq!(*left.borrow(), "4");
}

// ============================================================================
// Redirects
// ============================================================================

#[test]
fn test_synchronous_redirect_halts_stale_chain() {
    let (host, nav, log) = setup();
    let weak = nav.downgrade();

    nav.route("/a", move |_ctx, next| {
        if let Some(nav) = weak.upgrade() {
            nav.replace("/c")?;
        }
        next.call()?;
        Ok(())
    })
    .unwrap();
    nav.route_chain("/a", vec![record(&log, "stale a", false)]).unwrap();
    nav.route_chain("/c", vec![record(&log, "enter c", false)]).unwrap();

    let ctx = nav.show("/a").unwrap();

    assert_eq!(entries(&log), vec!["enter c"]);
    assert_eq!(ctx.handled(), Some(false));
    assert_eq!(nav.current(), "/c");
    assert_eq!(nav.history_len(), 0);
    assert_eq!(host.location().pathname, "/c");
}

#[test]
fn test_redirect_is_deferred() {
    let (host, nav, log) = setup();
    nav.redirect("/old", "/new").unwrap();
    nav.route_chain("/new", vec![record(&log, "new", false)]).unwrap();

    nav.show("/old").unwrap();
    assert!(entries(&log).is_empty());
    assert!(nav.has_deferred());

    assert_eq!(nav.run_deferred().unwrap(), 1);
    assert_eq!(entries(&log), vec!["new"]);
    assert_eq!(nav.current(), "/new");
    assert_eq!(host.current_entry().unwrap().url, "/new");
}

// ============================================================================
// Unhandled paths
// ============================================================================

#[test]
fn test_unhandled_path_escalates_once() {
    let (host, nav, _log) = setup();
    nav.route("/known", |_ctx, _next| Ok(())).unwrap();

    let ctx = nav.show("/nowhere").unwrap();

    assert_eq!(host.assigned(), vec!["/nowhere"]);
    assert_eq!(ctx.handled(), Some(false));
    assert_eq!(nav.history_len(), 0);
}

#[test]
fn test_unhandled_path_already_shown_is_ignored() {
    let (host, nav, _log) = setup();

    nav.replace("/nowhere").unwrap();
    assert!(host.assigned().is_empty());
}

#[test]
fn test_unhandled_after_delegation() {
    let (host, nav, log) = setup();
    nav.route_chain("/partial", vec![record(&log, "partial", true)]).unwrap();

    nav.show("/partial").unwrap();
    assert_eq!(entries(&log), vec!["partial"]);
    assert_eq!(host.assigned(), vec!["/partial"]);
}

#[test]
fn test_unhandled_stops_running_navigator() {
    let (host, nav, _log) = setup();
    nav.route("/", |_ctx, _next| Ok(())).unwrap();
    nav.start(Options::default()).unwrap();
    assert!(nav.is_running());

    nav.show("/missing").unwrap();
    assert!(!nav.is_running());
    assert_eq!(host.listeners(), Listeners::default());
}

// ============================================================================
// Back navigation
// ============================================================================

#[test]
fn test_back_with_history_never_uses_fallback() {
    let (host, nav, _log) = setup();
    let fallback_hits = Rc::new(Cell::new(0));
    let hits = Rc::clone(&fallback_hits);

    nav.route("/a", |_ctx, _next| Ok(())).unwrap();
    nav.route("/b", |_ctx, _next| Ok(())).unwrap();
    nav.route("/fallback", move |_ctx, _next| {
        hits.set(hits.get() + 1);
        Ok(())
    })
    .unwrap();

    nav.show("/a").unwrap();
    nav.show("/b").unwrap();
    assert_eq!(nav.history_len(), 2);

    nav.back(Some("/fallback"), None);
    assert_eq!(nav.history_len(), 1);
    assert_eq!(host.back_calls(), 1);
    assert!(!nav.has_deferred());
    assert_eq!(nav.run_deferred().unwrap(), 0);
    assert_eq!(fallback_hits.get(), 0);
}

#[test]
fn test_back_without_history_shows_fallback_later() {
    let (host, nav, log) = setup();
    nav.route_chain("/fallback", vec![record(&log, "fallback", false)]).unwrap();

    nav.back(Some("/fallback"), None);
    assert!(entries(&log).is_empty());
    assert_eq!(host.back_calls(), 0);

    nav.run_deferred().unwrap();
    assert_eq!(entries(&log), vec!["fallback"]);
    assert_eq!(nav.current(), "/fallback");
}

#[test]
fn test_back_without_history_or_fallback_shows_base() {
    let (_host, nav, log) = setup();
    nav.set_base("/app");
    nav.route_chain("/", vec![record(&log, "home", false)]).unwrap();

    nav.back(None, None);
    nav.run_deferred().unwrap();

    assert_eq!(entries(&log), vec!["home"]);
    assert_eq!(nav.current(), "/");
}

// ============================================================================
// Base path and hashbang
// ============================================================================

#[test]
fn test_base_path_is_added_and_stripped() {
    let (host, nav, log) = setup();
    nav.set_base("/app");
    nav.route_chain("/settings", vec![record(&log, "settings", false)]).unwrap();

    let ctx = nav.show("/settings").unwrap();
    assert_eq!(ctx.canonical_path(), "/app/settings");
    assert_eq!(ctx.path(), "/settings");
    assert_eq!(host.location().pathname, "/app/settings");
    assert_eq!(entries(&log), vec!["settings"]);
}

#[test]
fn test_hashbang_urls() {
    let (host, nav, log) = setup();
    host.set_location(Location {
        pathname: "/index.html".to_string(),
        hash: "#!/inbox".to_string(),
        protocol: "https:".to_string(),
        ..Location::default()
    });
    nav.set_base("/index.html");
    nav.route_chain("/inbox", vec![record(&log, "inbox", false)]).unwrap();
    nav.route_chain("/sent", vec![record(&log, "sent", false)]).unwrap();

    nav.start(Options {
        hashbang: true,
        ..Options::default()
    })
    .unwrap();
    assert_eq!(nav.current(), "/inbox");

    let ctx = nav.show("/sent").unwrap();
    assert_eq!(ctx.canonical_path(), "/index.html#!/sent");
    assert_eq!(host.current_entry().unwrap().url, "#!/sent");
    assert_eq!(host.location().hash, "#!/sent");
    assert_eq!(entries(&log), vec!["inbox", "sent"]);
    assert!(host.assigned().is_empty());
}

#[test]
fn test_file_protocol_hashbang_uses_document_path_as_base() {
    let (host, nav, log) = setup();
    host.set_location(Location {
        pathname: "/home/me/index.html".to_string(),
        protocol: "file:".to_string(),
        ..Location::default()
    });
    nav.configure(Options {
        hashbang: true,
        ..Options::default()
    });
    nav.route_chain("/inbox", vec![record(&log, "inbox", false)]).unwrap();

    let ctx = nav.show("/inbox").unwrap();
    assert_eq!(ctx.canonical_path(), "/home/me/index.html#!/inbox");
    assert_eq!(ctx.state().path, "/home/me/index.html#!/inbox");
    assert_eq!(ctx.path(), "/inbox");

    let missing = nav.show("/missing").unwrap();
    assert_eq!(missing.canonical_path(), "/home/me/index.html#!/missing");
    assert_eq!(missing.handled(), Some(false));
    assert_eq!(host.assigned(), vec!["/home/me/index.html#!/missing"]);

    // A persisted state path maps back to the same logical path
    nav.pop_state(Some(ctx.state())).unwrap();
    assert_eq!(nav.current(), "/inbox");
    assert_eq!(entries(&log), vec!["inbox", "inbox"]);
}

#[test]
fn test_malformed_percent_encoding_reaches_handler_raw() {
    let (_host, nav, _log) = setup();
    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    nav.route("/users/:id", move |ctx, _next| {
        *sink.borrow_mut() = ctx.param("id");
        Ok(())
    })
    .unwrap();

    let ctx = nav.show("/users/%E0%A4%A").unwrap();
    assert_eq!(*seen.borrow(), Some("%E0%A4%A".to_string()));
    assert_eq!(ctx.handled(), Some(true));
}

#[test]
fn test_pop_state_restores_entry() {
    let (host, nav, log) = setup();
    nav.route_chain("/a", vec![record(&log, "a", false)]).unwrap();
    nav.route_chain("/b", vec![record(&log, "b", false)]).unwrap();

    nav.show("/a").unwrap();
    nav.show("/b").unwrap();

    host.back();
    let state = host.current_entry().unwrap().state;
    nav.pop_state(Some(state)).unwrap();

    assert_eq!(entries(&log), vec!["a", "b", "a"]);
    assert_eq!(nav.current(), "/a");
}
