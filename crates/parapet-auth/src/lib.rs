//! Stack-scoped access control for Parapet.
//!
//! This crate decides one question: *may the code currently on the
//! stack exercise this permission?* Hosts annotate the stack with
//! protection domains as execution crosses trust boundaries; a check
//! walks the annotations innermost to outermost, and every domain on
//! the effective path must imply the permission. Deny wins.
//!
//! # Model
//!
//! ```text
//! Effective path = annotated frames (innermost → outermost)
//!                  ∪ inherited context (adopted at thread start)
//!
//! do_privileged(..)          ── stops the walk: outer frames stop mattering
//! do_privileged_with(ctx)    ── stops the walk: ctx decides instead
//! do_privileged_limited(..)  ── stops the walk only for covered requests
//! ```
//!
//! | Type | Role |
//! |------|------|
//! | [`Permission`] | names a guarded action; `implies` is the comparison |
//! | [`ProtectionDomain`] / [`DomainRef`] | code source + its grants |
//! | [`AccessContext`] | immutable domain-set snapshot with cheap extension |
//! | [`AccessController`] | walks, scopes, captures, memoizes |
//! | [`DomainCombiner`] | rewrites the consulted domains wholesale |
//!
//! # Crate Architecture
//!
//! ```text
//! parapet-types  (CodeSource, FrameId, ErrorCode)
//!       ↑
//! parapet-auth   (Permission, ProtectionDomain, AccessContext,
//!                 AccessController, ThreadStack)      ◄── THIS CRATE
//! ```
//!
//! # Design Principles
//!
//! - **Trait definitions here, permission models in hosts** — the
//!   crate never interprets what a permission means, only whether a
//!   domain implies it ([`testing`] ships a small concrete family for
//!   wiring tests).
//! - **Guards, not discipline** — annotations, privileged scopes, and
//!   thread cells are all restored by `Drop`, so early return and
//!   unwind cannot leave stale authority behind.
//! - **Memoization is invisible** — the frame cache only ever changes
//!   how fast a decision is reached, never which decision.
//!
//! # Example
//!
//! ```
//! use parapet_auth::testing::{Access, ActionPermission, StaticDomain};
//! use parapet_auth::AccessController;
//!
//! let ctl = AccessController::new();
//!
//! // Trusted core calls into a read-only plugin...
//! let _core = ctl.annotate(StaticDomain::new("core", Access::ALL));
//! let _plugin = ctl.annotate(StaticDomain::new("plugin", Access::READ));
//!
//! // ...so writes are refused while the plugin is on the stack,
//! assert!(ctl.check_permission(&ActionPermission::new(Access::WRITE)).is_err());
//!
//! // unless the plugin's caller asserts privilege for the write.
//! let done = ctl.do_privileged(|| ctl.check_permission(&ActionPermission::new(Access::WRITE)));
//! assert!(done.is_ok());
//! ```

pub mod cache;
pub mod cell;
pub mod combiner;
pub mod context;
pub mod controller;
pub mod domain;
pub mod error;
pub mod permission;
pub mod testing;
pub mod walker;

// Re-export core types
pub use cache::FrameCache;
pub use cell::{adopted_context, bind_adopted_context, installed_context};
pub use combiner::DomainCombiner;
pub use context::AccessContext;
pub use controller::AccessController;
pub use domain::{root_domain, DomainRef, GrantedDomain, ProtectionDomain};
pub use error::{AccessError, PrivilegedActionError};
pub use permission::{Permission, PermissionSet};
pub use walker::{Frame, FrameGuard, PrivilegeScope, StackWalker, ThreadStack, Walk};

// Re-export identifier types from parapet_types for convenience
pub use parapet_types::{CodeSource, FrameId};
