//! The access controller.
//!
//! [`AccessController`] ties the pieces together: it walks the
//! annotated stack to decide permission checks, runs privileged
//! scopes, and captures context snapshots.
//!
//! # Decision order
//!
//! `check_permission` resolves in three stages:
//!
//! 1. **Combiner bypass** — if the thread's inherited context carries
//!    a [`DomainCombiner`](crate::DomainCombiner), the combiner rewrites the whole stack's
//!    domains and the rewritten set is checked instead; no walk, no
//!    memoization.
//! 2. **Stack walk** — frames are visited innermost first. An
//!    ordinary frame with a memoized outward context delegates to it;
//!    an ordinary frame whose domain refuses denies; a boundary whose
//!    limit covers the request delegates to the scope's context (the
//!    unrestricted root for a plain `do_privileged`); a boundary
//!    whose limit does not cover the request is skipped entirely.
//! 3. **Inherited fallback** — an exhausted walk delegates to the
//!    thread's adopted context, or the root if none was bound.
//!
//! # Scopes
//!
//! The `do_privileged` family runs a closure under a boundary frame
//! and a swapped thread cell; both are guard-backed, so early return
//! and unwind restore them identically. `try_*` variants additionally
//! wrap the closure's error in [`PrivilegedActionError`].

use std::sync::Arc;

use parapet_types::{CodeSource, FrameId};
use tracing::{debug, warn};

use crate::cache::FrameCache;
use crate::cell;
use crate::context::AccessContext;
use crate::domain::{root_domain, DomainRef, GrantedDomain};
use crate::error::{AccessError, PrivilegedActionError};
use crate::permission::{Permission, PermissionSet};
use crate::walker::{Frame, PrivilegeScope, StackWalker, ThreadStack, Walk};

/// Decides permission checks against an annotated stack.
///
/// Generic over the [`StackWalker`] so tests can drive it with a
/// synthetic stack; production code uses the default
/// [`ThreadStack`].
///
/// # Example
///
/// ```
/// use parapet_auth::testing::{Access, ActionPermission, StaticDomain};
/// use parapet_auth::AccessController;
///
/// let ctl = AccessController::new();
/// let _frame = ctl.annotate(StaticDomain::new("core", Access::READ));
///
/// assert!(ctl.check_permission(&ActionPermission::new(Access::READ)).is_ok());
/// assert!(ctl.check_permission(&ActionPermission::new(Access::WRITE)).is_err());
/// ```
#[derive(Debug)]
pub struct AccessController<W: StackWalker = ThreadStack> {
    walker: W,
    cache: FrameCache,
}

impl AccessController<ThreadStack> {
    /// Creates a controller over the thread-local frame stack.
    #[must_use]
    pub fn new() -> Self {
        Self::with_walker(ThreadStack::new())
    }
}

impl Default for AccessController<ThreadStack> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: StackWalker> AccessController<W> {
    /// Creates a controller over the given walker with an empty
    /// frame cache.
    #[must_use]
    pub fn with_walker(walker: W) -> Self {
        Self {
            walker,
            cache: FrameCache::new(),
        }
    }

    /// Returns the walker driving this controller.
    #[must_use]
    pub fn walker(&self) -> &W {
        &self.walker
    }

    /// Returns the frame cache.
    #[must_use]
    pub fn frame_cache(&self) -> &FrameCache {
        &self.cache
    }

    /// Pushes an ordinary frame for `domain`; the annotation lasts
    /// until the returned guard drops.
    #[must_use = "the annotation ends when the guard drops"]
    pub fn annotate(&self, domain: DomainRef) -> W::Guard {
        self.walker.enter(Frame::ordinary(domain))
    }

    // ============================================
    // Checking
    // ============================================

    /// Checks whether the current stack may exercise `perm`.
    ///
    /// Outcomes are audit-logged: allowed at `debug`, denied at
    /// `warn`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Denied`] naming the innermost refusing
    /// domain on the effective path.
    pub fn check_permission(&self, perm: &dyn Permission) -> Result<(), AccessError> {
        let inherited = cell::effective_inherited();
        let result = if let Some(combiner) = inherited.combiner().cloned() {
            let whole = self.get_context();
            let combined = combiner.combine(&whole.domains(), &[]);
            AccessContext::root()
                .with_all(combined)
                .check_permission(perm)
        } else {
            self.walk_check(perm)
        };
        match &result {
            Ok(()) => debug!(permission = %perm, "access allowed"),
            Err(e) => warn!(permission = %perm, denied_by = %e.denied_by(), "access denied"),
        }
        result
    }

    fn walk_check(&self, perm: &dyn Permission) -> Result<(), AccessError> {
        enum Outcome {
            Denied(AccessError),
            Delegate(AccessContext),
        }

        let mut outcome: Option<Outcome> = None;
        self.walker.walk(&mut |frame| match frame {
            Frame::Boundary(scope) => {
                if let Some(limit) = scope.limit() {
                    if !limit.implies(perm) {
                        // Privilege does not cover this request; the
                        // boundary is transparent to it.
                        return Walk::Continue;
                    }
                }
                let ctx = scope
                    .context()
                    .cloned()
                    .unwrap_or_else(AccessContext::root);
                outcome = Some(Outcome::Delegate(ctx));
                Walk::Stop
            }
            Frame::Ordinary { id, domain } => {
                if let Some(cached) = self.cache.get(id) {
                    outcome = Some(Outcome::Delegate(cached));
                    return Walk::Stop;
                }
                if !domain.implies(perm) {
                    outcome = Some(Outcome::Denied(AccessError::denied(perm, domain)));
                    return Walk::Stop;
                }
                Walk::Continue
            }
        });

        match outcome {
            Some(Outcome::Denied(err)) => Err(err),
            Some(Outcome::Delegate(ctx)) => ctx.check_permission(perm),
            None => cell::base_inherited().check_permission(perm),
        }
    }

    // ============================================
    // Privileged Scopes
    // ============================================

    /// Runs `action` with full privilege: checks made inside stop at
    /// this boundary and pass.
    pub fn do_privileged<T>(&self, action: impl FnOnce() -> T) -> T {
        let _cell = cell::install(None);
        let _frame = self.walker.enter(Frame::boundary(PrivilegeScope::unrestricted()));
        action()
    }

    /// Runs `action` with privilege bounded by `context`: checks made
    /// inside stop at this boundary and are decided by `context`
    /// alone.
    ///
    /// Pass [`AccessContext::root`] for the behavior of
    /// [`do_privileged`](Self::do_privileged).
    pub fn do_privileged_with<T>(&self, context: AccessContext, action: impl FnOnce() -> T) -> T {
        let _cell = cell::install(Some(context.clone()));
        let _frame = self
            .walker
            .enter(Frame::boundary(PrivilegeScope::with_context(context)));
        action()
    }

    /// Runs `action` with privilege bounded by `context` and
    /// restricted to permissions implied by `limit`.
    ///
    /// Requests the limit covers stop at this boundary and are
    /// decided by `context` plus a synthetic domain granting exactly
    /// `limit` (attributed to the innermost annotated frame's
    /// source). Requests the limit does not cover pass through as if
    /// this scope did not exist — an empty `limit` therefore disables
    /// the scope's privilege entirely.
    pub fn do_privileged_limited<T>(
        &self,
        context: AccessContext,
        limit: PermissionSet,
        action: impl FnOnce() -> T,
    ) -> T {
        let limiting = DomainRef::new(GrantedDomain::new(self.caller_source(), limit.clone()));
        let installed = context.with(limiting);
        let _cell = cell::install(Some(installed.clone()));
        let _frame = self
            .walker
            .enter(Frame::boundary(PrivilegeScope::limited(installed, limit)));
        action()
    }

    /// Fallible form of [`do_privileged`](Self::do_privileged).
    ///
    /// # Errors
    ///
    /// Wraps the action's error in [`PrivilegedActionError`].
    pub fn try_do_privileged<T, E>(
        &self,
        action: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, PrivilegedActionError<E>>
    where
        E: std::error::Error,
    {
        self.do_privileged(action).map_err(PrivilegedActionError::new)
    }

    /// Fallible form of [`do_privileged_with`](Self::do_privileged_with).
    ///
    /// # Errors
    ///
    /// Wraps the action's error in [`PrivilegedActionError`].
    pub fn try_do_privileged_with<T, E>(
        &self,
        context: AccessContext,
        action: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, PrivilegedActionError<E>>
    where
        E: std::error::Error,
    {
        self.do_privileged_with(context, action)
            .map_err(PrivilegedActionError::new)
    }

    /// Fallible form of [`do_privileged_limited`](Self::do_privileged_limited).
    ///
    /// # Errors
    ///
    /// Wraps the action's error in [`PrivilegedActionError`].
    pub fn try_do_privileged_limited<T, E>(
        &self,
        context: AccessContext,
        limit: PermissionSet,
        action: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, PrivilegedActionError<E>>
    where
        E: std::error::Error,
    {
        self.do_privileged_limited(context, limit, action)
            .map_err(PrivilegedActionError::new)
    }

    // ============================================
    // Capture
    // ============================================

    /// Captures the current authorization state as a context.
    ///
    /// The snapshot contains every annotated frame's domain (capture
    /// does not truncate at privilege boundaries), the thread's
    /// adopted context, and — when a scope is active — the installed
    /// context's restrictions and combiner.
    ///
    /// Along the way, frames with no boundary outward of them get
    /// their outward context memoized: for such a frame the outward
    /// stack is frozen for its whole lifetime, so the entry can never
    /// go stale. Memoization never changes any result, only the work
    /// done to reach it.
    #[must_use]
    pub fn get_context(&self) -> AccessContext {
        enum Entry {
            Frame(FrameId, DomainRef),
            Boundary,
        }

        let mut pending: Vec<Entry> = Vec::new();
        let mut found: Option<AccessContext> = None;
        self.walker.walk(&mut |frame| match frame {
            Frame::Ordinary { id, domain } => {
                if let Some(cached) = self.cache.get(id) {
                    found = Some(cached);
                    return Walk::Stop;
                }
                pending.push(Entry::Frame(*id, domain.clone()));
                Walk::Continue
            }
            Frame::Boundary(_) => {
                pending.push(Entry::Boundary);
                Walk::Continue
            }
        });

        let mut context = found.unwrap_or_else(cell::base_inherited);
        let mut boundary_outward = false;
        for entry in pending.into_iter().rev() {
            match entry {
                Entry::Boundary => boundary_outward = true,
                Entry::Frame(id, domain) => {
                    context = context.with_kept_combiner(domain);
                    if !boundary_outward {
                        self.cache.insert(id, context.clone());
                    }
                }
            }
        }

        if let Some(installed) = cell::installed_context() {
            context = context.intersect(&installed);
            if let Some(combiner) = installed.combiner() {
                context = context.with_combiner(Arc::clone(combiner));
            }
        }
        context
    }

    /// Returns the context the caller would be privileged under: its
    /// own domain and nothing else.
    #[must_use]
    pub fn get_privileged_context(&self) -> AccessContext {
        AccessContext::root().with(self.caller_domain())
    }

    /// Like [`get_privileged_context`](Self::get_privileged_context),
    /// additionally restricted to permissions implied by `limit`.
    #[must_use]
    pub fn get_privileged_context_limited(&self, limit: PermissionSet) -> AccessContext {
        let caller = self.caller_domain();
        let source = caller.code_source().clone();
        AccessContext::root()
            .with(caller)
            .with(DomainRef::new(GrantedDomain::new(source, limit)))
    }

    /// Innermost annotated frame's domain; the unrestricted root if
    /// the stack carries no annotations.
    fn caller_domain(&self) -> DomainRef {
        let mut found: Option<DomainRef> = None;
        self.walker.walk(&mut |frame| {
            if let Frame::Ordinary { domain, .. } = frame {
                found = Some(domain.clone());
                Walk::Stop
            } else {
                Walk::Continue
            }
        });
        found.unwrap_or_else(root_domain)
    }

    /// Innermost annotated frame's source; `unattributed` if none.
    fn caller_source(&self) -> CodeSource {
        let mut found: Option<CodeSource> = None;
        self.walker.walk(&mut |frame| {
            if let Frame::Ordinary { domain, .. } = frame {
                found = Some(domain.code_source().clone());
                Walk::Stop
            } else {
                Walk::Continue
            }
        });
        found.unwrap_or_else(CodeSource::unattributed)
    }
}
