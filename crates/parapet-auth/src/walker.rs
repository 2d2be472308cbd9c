//! The annotated frame stack.
//!
//! Parapet has no view of the real call stack, so hosts annotate it:
//! code entering a unit of work pushes an *ordinary* frame carrying
//! its protection domain, and privileged scopes push *boundary*
//! frames carrying the scope's installed context and optional
//! limiting set. Pushing returns a [`FrameGuard`] that truncates the
//! stack back to its prior depth on drop, so the annotation holds
//! under early return and unwind alike.
//!
//! [`StackWalker`] abstracts iteration so the controller can be
//! driven by a synthetic stack in tests; [`ThreadStack`] is the
//! production implementation over a thread-local `Vec`.

use std::cell::RefCell;
use std::marker::PhantomData;

use parapet_types::FrameId;

use crate::context::AccessContext;
use crate::domain::DomainRef;
use crate::permission::PermissionSet;

/// What a privileged-scope boundary installs and allows.
///
/// Carried by the boundary frame itself (not just the thread cell):
/// a limited boundary that is transparent to one request must not
/// leak its installed context into an outer boundary's decision, so
/// each boundary must be able to answer for itself.
#[derive(Clone, Debug)]
pub struct PrivilegeScope {
    context: Option<AccessContext>,
    limit: Option<PermissionSet>,
}

impl PrivilegeScope {
    /// A scope asserting full privilege with no installed context.
    #[must_use]
    pub(crate) fn unrestricted() -> Self {
        Self {
            context: None,
            limit: None,
        }
    }

    /// A scope asserting privilege under an installed context.
    #[must_use]
    pub(crate) fn with_context(context: AccessContext) -> Self {
        Self {
            context: Some(context),
            limit: None,
        }
    }

    /// A scope whose assertion only covers permissions implied by
    /// `limit`.
    #[must_use]
    pub(crate) fn limited(context: AccessContext, limit: PermissionSet) -> Self {
        Self {
            context: Some(context),
            limit: Some(limit),
        }
    }

    /// Returns the context the scope installed, if any.
    #[must_use]
    pub fn context(&self) -> Option<&AccessContext> {
        self.context.as_ref()
    }

    /// Returns the limiting set, if the scope is limited.
    #[must_use]
    pub fn limit(&self) -> Option<&PermissionSet> {
        self.limit.as_ref()
    }
}

/// One annotated stack entry.
#[derive(Clone, Debug)]
pub enum Frame {
    /// A unit of host code running under `domain`.
    Ordinary {
        /// Activation-unique id, the frame-cache key.
        id: FrameId,
        /// The domain the code runs under.
        domain: DomainRef,
    },
    /// A privileged-scope boundary.
    Boundary(PrivilegeScope),
}

impl Frame {
    /// Creates an ordinary frame for `domain` with a fresh
    /// activation id.
    #[must_use]
    pub fn ordinary(domain: DomainRef) -> Self {
        Self::Ordinary {
            id: FrameId::next(domain.code_source()),
            domain,
        }
    }

    pub(crate) fn boundary(scope: PrivilegeScope) -> Self {
        Self::Boundary(scope)
    }

    /// Returns `true` for boundary frames.
    #[must_use]
    pub fn is_boundary(&self) -> bool {
        matches!(self, Self::Boundary(_))
    }
}

/// Visitor verdict for [`StackWalker::walk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// Keep walking outward.
    Continue,
    /// Short-circuit; remaining frames are not visited.
    Stop,
}

/// Source of annotated frames for the controller.
///
/// `walk` visits frames innermost first and stops early when the
/// visitor says so — implementations should not materialize frames
/// the visitor never sees.
pub trait StackWalker: Send + Sync {
    /// Scope handle returned by [`enter`](Self::enter); popping
    /// happens when it drops.
    type Guard;

    /// Visits frames innermost to outermost until `visit` stops the
    /// walk or the stack is exhausted.
    fn walk(&self, visit: &mut dyn FnMut(&Frame) -> Walk);

    /// Pushes `frame`, returning a guard that removes it (and any
    /// frames left above it) when dropped.
    fn enter(&self, frame: Frame) -> Self::Guard;
}

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// The thread-local frame stack.
///
/// A unit type: all state lives in the current thread. Any number of
/// `ThreadStack` values on one thread see the same frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadStack;

impl ThreadStack {
    /// Creates a handle to the current thread's stack.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the current annotation depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        FRAMES.with(|f| f.borrow().len())
    }
}

impl StackWalker for ThreadStack {
    type Guard = FrameGuard;

    fn walk(&self, visit: &mut dyn FnMut(&Frame) -> Walk) {
        // Re-borrow per step: the visitor may run domain code that
        // re-enters the walker on this thread.
        let mut i = FRAMES.with(|f| f.borrow().len());
        while i > 0 {
            i -= 1;
            let Some(frame) = FRAMES.with(|f| f.borrow().get(i).cloned()) else {
                break;
            };
            if visit(&frame) == Walk::Stop {
                break;
            }
        }
    }

    fn enter(&self, frame: Frame) -> FrameGuard {
        let depth = FRAMES.with(|f| {
            let mut frames = f.borrow_mut();
            frames.push(frame);
            frames.len() - 1
        });
        FrameGuard {
            depth,
            _not_send: PhantomData,
        }
    }
}

/// Truncates the thread's frame stack back to the depth saved at
/// [`StackWalker::enter`] when dropped.
///
/// Truncation (rather than a single pop) keeps the stack consistent
/// even if inner guards were leaked. `!Send`: the guard must drop on
/// the thread that pushed.
#[derive(Debug)]
pub struct FrameGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        FRAMES.with(|f| f.borrow_mut().truncate(self.depth));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Access, StaticDomain};

    fn domain(name: &str) -> DomainRef {
        StaticDomain::new(name, Access::READ)
    }

    fn collect_sources(stack: &ThreadStack) -> Vec<String> {
        let mut names = Vec::new();
        stack.walk(&mut |frame| {
            if let Frame::Ordinary { domain, .. } = frame {
                names.push(domain.code_source().name.clone());
            }
            Walk::Continue
        });
        names
    }

    #[test]
    fn walk_visits_innermost_first() {
        let stack = ThreadStack::new();
        let _outer = stack.enter(Frame::ordinary(domain("outer")));
        let _inner = stack.enter(Frame::ordinary(domain("inner")));

        assert_eq!(collect_sources(&stack), vec!["inner", "outer"]);
    }

    #[test]
    fn walk_stops_on_request() {
        let stack = ThreadStack::new();
        let _a = stack.enter(Frame::ordinary(domain("a")));
        let _b = stack.enter(Frame::ordinary(domain("b")));

        let mut visited = 0;
        stack.walk(&mut |_| {
            visited += 1;
            Walk::Stop
        });
        assert_eq!(visited, 1);
    }

    #[test]
    fn guard_pops_on_drop() {
        let stack = ThreadStack::new();
        assert_eq!(stack.depth(), 0);
        {
            let _a = stack.enter(Frame::ordinary(domain("a")));
            assert_eq!(stack.depth(), 1);
            {
                let _b = stack.enter(Frame::ordinary(domain("b")));
                assert_eq!(stack.depth(), 2);
            }
            assert_eq!(stack.depth(), 1);
        }
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn guard_truncates_on_unwind() {
        let stack = ThreadStack::new();
        let result = std::panic::catch_unwind(|| {
            let _a = stack.enter(Frame::ordinary(domain("a")));
            let _b = stack.enter(Frame::ordinary(domain("b")));
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn outer_guard_truncates_past_leaked_inner() {
        let stack = ThreadStack::new();
        {
            let _a = stack.enter(Frame::ordinary(domain("a")));
            let b = stack.enter(Frame::ordinary(domain("b")));
            std::mem::forget(b);
            assert_eq!(stack.depth(), 2);
        }
        // Dropping the outer guard removed the leaked frame too.
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn ordinary_frames_get_distinct_activations() {
        let d = domain("a");
        let (Frame::Ordinary { id: a, .. }, Frame::Ordinary { id: b, .. }) =
            (Frame::ordinary(d.clone()), Frame::ordinary(d))
        else {
            panic!("expected ordinary frames");
        };
        assert_ne!(a, b);
    }

    #[test]
    fn visitor_may_reenter_the_walker() {
        let stack = ThreadStack::new();
        let _a = stack.enter(Frame::ordinary(domain("a")));

        let mut nested = 0;
        stack.walk(&mut |_| {
            stack.walk(&mut |_| {
                nested += 1;
                Walk::Stop
            });
            Walk::Stop
        });
        assert_eq!(nested, 1);
    }
}
