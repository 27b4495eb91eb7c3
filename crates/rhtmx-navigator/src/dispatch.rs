//! Two-phase dispatch engine
//!
//! A dispatch pass walks the exit middleware against the previous context,
//! then the enter middleware against the new one. Each middleware receives a
//! [`Next`] continuation; the pass only moves forward when it is called.
//!
//! The pass is an explicit cursor rather than nested calls: calling [`Next`]
//! while a middleware is still running only records the request, and the
//! driver loop that invoked the middleware picks it up once it returns. A
//! [`Next`] called later (after a timer, after a fetch) starts a fresh driver
//! loop from the recorded cursor. Either way the stack does not grow with the
//! length of the chain.
//!
//! ## Phases
//!
//! ```text
//! Exit(0) .. Exit(n)  ->  Enter(0) .. Enter(m)  ->  unhandled
//!      (only with a previous context)
//! ```
//!
//! Before each enter step the context's path is compared with the
//! navigator's current path. A mismatch means a newer navigation won; the
//! context is marked not handled and the pass halts.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::context::Context;
use crate::error::NavigationError;
use crate::navigator::Navigator;

/// Result returned by every middleware
pub type HandlerResult = anyhow::Result<()>;

/// One entry of the enter or exit chain
pub type Middleware = Rc<dyn Fn(&Context, Next) -> HandlerResult>;

/// Wraps a closure as a [`Middleware`]
///
/// # Examples
///
/// ```
/// use rhtmx_navigator::dispatch::handler;
///
/// let log_and_continue = handler(|ctx, next| {
///     println!("visiting {}", ctx.path());
///     next.call()?;
///     Ok(())
/// });
/// # let _ = log_and_continue;
/// ```
pub fn handler<F>(f: F) -> Middleware
where
    F: Fn(&Context, Next) -> HandlerResult + 'static,
{
    Rc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Exit(usize),
    Enter(usize),
    Finished,
}

/// What the driver loop does next
enum Step {
    Run(Middleware, Context),
    Unhandled,
    Halt,
}

struct DispatchState {
    navigator: Navigator,
    ctx: Context,
    prev: Option<Context>,
    phase: Phase,
    /// A continuation was requested and not yet acted on
    pending: bool,
    /// A driver loop is on the stack for this pass
    driving: bool,
}

impl DispatchState {
    /// Advances the cursor and picks the next step
    fn advance(&mut self) -> Step {
        loop {
            match self.phase {
                Phase::Exit(index) => {
                    let Some(prev) = self.prev.clone() else {
                        self.phase = Phase::Enter(0);
                        continue;
                    };
                    match self.navigator.exit_at(index) {
                        Some(middleware) => {
                            trace!(index, path = %prev.path(), "exit step");
                            self.phase = Phase::Exit(index + 1);
                            return Step::Run(middleware, prev);
                        }
                        None => self.phase = Phase::Enter(0),
                    }
                }
                Phase::Enter(index) => {
                    // Reaching here past the first step means the previous handler delegated
                    if index > 0 {
                        self.ctx.release_provisional();
                    }

                    let path = self.ctx.path();
                    if path != self.navigator.current() {
                        trace!(%path, "stale dispatch halted");
                        self.ctx.set_handled(false);
                        self.phase = Phase::Finished;
                        return Step::Halt;
                    }

                    match self.navigator.callback_at(index) {
                        Some(middleware) => {
                            trace!(index, %path, "enter step");
                            self.phase = Phase::Enter(index + 1);
                            return Step::Run(middleware, self.ctx.clone());
                        }
                        None => {
                            self.phase = Phase::Finished;
                            return Step::Unhandled;
                        }
                    }
                }
                Phase::Finished => return Step::Halt,
            }
        }
    }
}

/// Continuation handed to each middleware
///
/// Calling it lets the pass continue with the next middleware. Dropping it
/// without calling it halts the pass at the current middleware.
pub struct Next {
    state: Rc<RefCell<DispatchState>>,
}

impl Next {
    /// Continues the dispatch pass
    ///
    /// Inside a running middleware this returns immediately and the pass
    /// resumes when the middleware returns. Called after the middleware has
    /// returned, it drives the rest of the pass before returning, so errors
    /// from later middleware surface here.
    pub fn call(self) -> Result<(), NavigationError> {
        let driving = {
            let mut state = self.state.borrow_mut();
            if state.phase == Phase::Finished {
                return Ok(());
            }
            state.pending = true;
            state.driving
        };

        if driving {
            Ok(())
        } else {
            drive(&self.state)
        }
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Next")
            .field("phase", &state.phase)
            .field("path", &state.ctx.path())
            .finish()
    }
}

/// Runs one dispatch pass for `ctx`, starting with the exit chain when `prev` is set
pub(crate) fn run(
    navigator: &Navigator,
    ctx: &Context,
    prev: Option<Context>,
) -> Result<(), NavigationError> {
    let phase = if prev.is_some() {
        Phase::Exit(0)
    } else {
        Phase::Enter(0)
    };

    let state = Rc::new(RefCell::new(DispatchState {
        navigator: navigator.clone(),
        ctx: ctx.clone(),
        prev,
        phase,
        pending: true,
        driving: false,
    }));

    drive(&state)
}

/// Driver loop: runs steps while continuations are pending
fn drive(state: &Rc<RefCell<DispatchState>>) -> Result<(), NavigationError> {
    state.borrow_mut().driving = true;

    let result = loop {
        let step = {
            let mut current = state.borrow_mut();
            if !current.pending {
                break Ok(());
            }
            current.pending = false;
            current.advance()
        };

        match step {
            Step::Run(middleware, ctx) => {
                let next = Next {
                    state: Rc::clone(state),
                };
                if let Err(error) = middleware(&ctx, next) {
                    state.borrow_mut().phase = Phase::Finished;
                    break Err(NavigationError::Handler(error));
                }
            }
            Step::Unhandled => {
                let (navigator, ctx) = {
                    let current = state.borrow();
                    (current.navigator.clone(), current.ctx.clone())
                };
                unhandled(&navigator, &ctx);
                break Ok(());
            }
            Step::Halt => break Ok(()),
        }
    };

    state.borrow_mut().driving = false;
    result
}

/// End of the enter chain with no handler claiming the context
///
/// When the host already shows the canonical address nothing happens;
/// otherwise the navigator stops and the host performs a full page load.
fn unhandled(navigator: &Navigator, ctx: &Context) {
    if ctx.handled() == Some(true) {
        return;
    }

    let host = navigator.host();
    let location = host.location();
    let current = if navigator.options().hashbang {
        format!(
            "{}{}",
            navigator.effective_base(),
            location.hash.replacen("#!", "", 1)
        )
    } else {
        location.path_and_query()
    };

    let canonical = ctx.canonical_path();
    if current == canonical {
        trace!(%canonical, "unhandled path already shown by host");
        return;
    }

    warn!(%canonical, %current, "no route handled navigation, falling back to full page load");
    navigator.stop();
    ctx.set_handled(false);
    host.assign(&canonical);
}
