//! Context trail and the logging choke point
//!
//! Public operations push a human-readable label describing what they are
//! doing and hold the returned [`ContextGuard`] until they finish. Errors
//! snapshot the trail when they are created, so a failure deep inside a
//! delegated call still reports the path that led to it.
//!
//! The trail is thread-local: each thread acts as its own single-threaded
//! host. Guards pop on drop, so the trail stays balanced on every exit path
//! including early returns through `?`.
//!
//! All errors and warnings the engine reports are written through
//! [`error`], [`input_error`] and [`warn`]. Logging can be switched off
//! globally with [`set_logging_enabled`]; this never changes what is
//! returned to the caller.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ErrorKind, JtacError};
use crate::value::Value;

thread_local! {
    static TRAIL: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

/// Scope of one pushed context label; pops the label when dropped.
#[must_use = "the context label is popped as soon as the guard is dropped"]
pub struct ContextGuard {
    depth: usize,
    // Guards must be dropped on the thread whose trail they modified.
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        TRAIL.with(|trail| trail.borrow_mut().truncate(self.depth));
    }
}

/// Push a context label for the lifetime of the returned guard
pub fn push_context(label: impl Into<String>) -> ContextGuard {
    let label = label.into();
    let depth = TRAIL.with(|trail| {
        let mut trail = trail.borrow_mut();
        let depth = trail.len();
        trail.push(label);
        depth
    });
    ContextGuard {
        depth,
        _not_send: PhantomData,
    }
}

/// Push a label annotated with the value being processed
pub fn push_context_value(label: &str, value: &Value) -> ContextGuard {
    push_context(format!("{}: {}", label, value))
}

/// Number of labels currently on this thread's trail
pub fn context_depth() -> usize {
    TRAIL.with(|trail| trail.borrow().len())
}

/// Snapshot of this thread's trail, outermost first
pub fn trail() -> Vec<String> {
    TRAIL.with(|trail| trail.borrow().clone())
}

/// Enable or disable logging of errors and warnings
pub fn set_logging_enabled(enabled: bool) {
    LOGGING_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Check whether errors and warnings are logged
pub fn logging_enabled() -> bool {
    LOGGING_ENABLED.load(Ordering::Relaxed)
}

/// Build an error for a programming or lookup failure and log it.
///
/// The caller returns the error; nothing is thrown from here.
pub fn error(kind: ErrorKind, class_name: Option<&str>) -> JtacError {
    let err = build(kind, class_name);
    if logging_enabled() {
        tracing::error!(
            target: "jtac",
            class = err.class_name().unwrap_or(""),
            trail = %err.trail().join(" > "),
            "{}",
            err.kind()
        );
    }
    err
}

/// Build an error for invalid external input and log it on the input channel
pub fn input_error(kind: ErrorKind, class_name: Option<&str>) -> JtacError {
    let err = build(kind, class_name);
    if logging_enabled() {
        tracing::error!(
            target: "jtac::input",
            class = err.class_name().unwrap_or(""),
            trail = %err.trail().join(" > "),
            "{}",
            err.kind()
        );
    }
    err
}

/// Log a diagnostic warning without failing
pub fn warn(message: &str, class_name: Option<&str>) {
    if logging_enabled() {
        tracing::warn!(
            target: "jtac",
            class = class_name.unwrap_or(""),
            trail = %trail().join(" > "),
            "{}",
            message
        );
    }
}

fn build(kind: ErrorKind, class_name: Option<&str>) -> JtacError {
    let err = JtacError::new(kind);
    match class_name {
        Some(name) => err.with_class(name),
        None => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guards_pop_in_scope_order() {
        let before = context_depth();
        {
            let _a = push_context("a");
            {
                let _b = push_context("b");
                assert_eq!(trail()[before..], ["a".to_string(), "b".to_string()]);
            }
            assert_eq!(context_depth(), before + 1);
        }
        assert_eq!(context_depth(), before);
    }

    #[test]
    fn test_early_return_restores_depth() {
        fn failing() -> Result<(), JtacError> {
            let _guard = push_context("failing");
            Err(error(ErrorKind::NameRequired, None))
        }

        let before = context_depth();
        let err = failing().unwrap_err();
        assert_eq!(context_depth(), before);
        assert_eq!(err.trail().last().map(String::as_str), Some("failing"));
    }

    #[test]
    fn test_outer_drop_discards_leaked_inner_labels() {
        let before = context_depth();
        let outer = push_context("outer");
        std::mem::forget(push_context("leaked"));
        drop(outer);
        assert_eq!(context_depth(), before);
    }

    #[test]
    fn test_push_context_value() {
        let _g = push_context_value("setRadius", &Value::Int(5));
        assert_eq!(trail().last().map(String::as_str), Some("setRadius: 5"));
    }

    #[test]
    fn test_error_attaches_class() {
        let err = error(ErrorKind::AbstractClass("A".into()), Some("A"));
        assert_eq!(err.class_name(), Some("A"));
    }
}
