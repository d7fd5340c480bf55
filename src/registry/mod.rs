//! `describe` / `it` registration API
//!
//! A `Registrar` is the capability handed to a test unit. It runs suite and
//! case bodies synchronously and records their outcomes into the summary it
//! borrows. Errors and panics are caught at the smallest enclosing boundary.
//!
//! Panics raised inside a guarded body are reported through the summary, so
//! the panic hook stays quiet for them. Panics anywhere else still reach the
//! previously installed hook.

use anyhow::Result;
use std::any::Any;
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Once;
use tracing::debug;

use crate::models::{RunSummary, TestCase, TraceLine};
use crate::utils::Timer;

/// Registration capability bound to one run summary
pub struct Registrar<'a> {
    summary: &'a mut RunSummary,
    suite: Option<String>,
}

impl<'a> Registrar<'a> {
    pub fn new(summary: &'a mut RunSummary) -> Self {
        Self {
            summary,
            suite: None,
        }
    }

    /// Run a suite body. A failure escaping `body` becomes one suite-level
    /// error tagged with `title`; counters are untouched.
    pub fn describe<F>(&mut self, title: &str, body: F)
    where
        F: FnOnce(&mut Registrar<'_>) -> Result<()>,
    {
        self.summary.trace(TraceLine::suite(title));

        let outer = self.suite.replace(title.to_string());
        let outcome = guard(|| body(&mut *self));
        self.suite = outer;

        if let Err(message) = outcome {
            debug!("Suite '{}' failed: {}", title, message);
            self.summary.record_suite_error(title, message);
        }
    }

    /// Run one case body and record its outcome
    pub fn it<F>(&mut self, title: &str, body: F)
    where
        F: FnOnce() -> Result<()>,
    {
        let case = TestCase::pending(title, self.suite.clone());
        self.summary.trace(TraceLine::start(title));

        let timer = Timer::start(title);
        let outcome = guard(body);
        let elapsed = timer.stop();

        let case = match outcome {
            Ok(()) => case.pass(elapsed),
            Err(message) => case.fail(elapsed, message),
        };

        self.summary
            .trace(TraceLine::finished(title, case.outcome, elapsed));
        self.summary.record_case(case);
    }
}

/// Run `body`, turning an `Err` or a panic into its message
pub fn guard<F>(body: F) -> std::result::Result<(), String>
where
    F: FnOnce() -> Result<()>,
{
    install_panic_hook();

    let outer = GUARDED.with(|g| g.replace(true));
    let outcome = catch_unwind(AssertUnwindSafe(body));
    GUARDED.with(|g| g.set(outer));

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

thread_local! {
    /// Set while this thread runs a guarded body
    static GUARDED: Cell<bool> = Cell::new(false);
}

static PANIC_HOOK: Once = Once::new();

/// Wrap the current hook so it skips panics raised inside `guard`
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if !is_guarded() {
                previous(info);
            }
        }));
    });
}

fn is_guarded() -> bool {
    GUARDED.with(Cell::get)
}

/// Extract the message carried by a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
