//! Thread context cells.
//!
//! Each thread carries two context slots:
//!
//! - the **adopted** context, bound at most once by the host when the
//!   thread starts (typically the spawner's captured context), and
//! - the **installed** context, swapped in and out by privileged
//!   scopes for their dynamic extent.
//!
//! Scope entry saves the previous installed value and swaps in the
//! new one; the returned guard restores the saved value on drop, so
//! the swap is undone on both return and unwind.

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::context::AccessContext;

thread_local! {
    static INSTALLED: RefCell<Option<AccessContext>> = const { RefCell::new(None) };
    static ADOPTED: RefCell<Option<AccessContext>> = const { RefCell::new(None) };
}

/// Returns the context installed by the innermost active privileged
/// scope on this thread, if any.
#[must_use]
pub fn installed_context() -> Option<AccessContext> {
    INSTALLED.with(|c| c.borrow().clone())
}

/// Returns the context this thread adopted at start, if any.
#[must_use]
pub fn adopted_context() -> Option<AccessContext> {
    ADOPTED.with(|c| c.borrow().clone())
}

/// Binds the context this thread inherits from its spawner.
///
/// Hosts call this once, first thing on a new thread, with the
/// context captured on the spawning side. Re-binding replaces the
/// previous value for checks and captures that have not yet run, but
/// frame-cache entries computed under the old binding keep delegating
/// to it for as long as their frames live. Bind before annotating any
/// frame whose checks should see the new value.
pub fn bind_adopted_context(context: AccessContext) {
    ADOPTED.with(|c| *c.borrow_mut() = Some(context));
}

/// The context a check falls back to when the walk exhausts the
/// stack: adopted if bound, unrestricted root otherwise.
pub(crate) fn base_inherited() -> AccessContext {
    adopted_context().unwrap_or_else(AccessContext::root)
}

/// The thread's effective inherited context: installed if a scope is
/// active, otherwise [`base_inherited`].
pub(crate) fn effective_inherited() -> AccessContext {
    installed_context().unwrap_or_else(base_inherited)
}

/// Swaps `context` into the installed cell, returning a guard that
/// restores the previous value on drop.
pub(crate) fn install(context: Option<AccessContext>) -> CellGuard {
    let saved = INSTALLED.with(|c| c.replace(context));
    CellGuard {
        saved,
        _not_send: PhantomData,
    }
}

/// Restores the saved installed context on drop.
///
/// `!Send`: the guard must be dropped on the thread whose cell it
/// saved.
pub(crate) struct CellGuard {
    saved: Option<AccessContext>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for CellGuard {
    fn drop(&mut self) {
        let saved = self.saved.take();
        INSTALLED.with(|c| *c.borrow_mut() = saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Access, StaticDomain};

    fn ctx(name: &str) -> AccessContext {
        AccessContext::from_domains([StaticDomain::new(name, Access::READ)])
    }

    #[test]
    fn install_restores_on_drop() {
        assert!(installed_context().is_none());
        {
            let _guard = install(Some(ctx("a")));
            assert_eq!(installed_context(), Some(ctx("a")));
            {
                let _inner = install(Some(ctx("b")));
                assert_eq!(installed_context(), Some(ctx("b")));
            }
            assert_eq!(installed_context(), Some(ctx("a")));
        }
        assert!(installed_context().is_none());
    }

    #[test]
    fn install_restores_on_unwind() {
        let result = std::panic::catch_unwind(|| {
            let _guard = install(Some(ctx("a")));
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(installed_context().is_none());
    }

    #[test]
    fn effective_prefers_installed_over_adopted() {
        bind_adopted_context(ctx("adopted"));
        assert_eq!(effective_inherited(), ctx("adopted"));
        assert_eq!(base_inherited(), ctx("adopted"));

        let _guard = install(Some(ctx("scope")));
        assert_eq!(effective_inherited(), ctx("scope"));
        // The fallback for an exhausted walk ignores the scope.
        assert_eq!(base_inherited(), ctx("adopted"));
    }

    #[test]
    fn unbound_thread_falls_back_to_root() {
        assert!(adopted_context().is_none());
        assert_eq!(base_inherited(), AccessContext::root());
    }
}
