//! Access-control error types.
//!
//! Two failures exist in this crate:
//!
//! ```text
//! check_permission ──► AccessError::Denied        (a domain refused)
//! try_do_privileged ─► PrivilegedActionError<E>   (the action failed)
//! ```
//!
//! Both implement [`ErrorCode`] so hosts can route them uniformly.

use parapet_types::{CodeSource, ErrorCode};
use thiserror::Error;

use crate::domain::DomainRef;
use crate::permission::Permission;

/// A permission check failed.
///
/// Carries the rendered permission and the code source of the domain
/// that refused — the innermost one on the effective path, which is
/// what an audit record wants to name.
///
/// # Example
///
/// ```
/// use parapet_auth::testing::{Access, ActionPermission, StaticDomain};
/// use parapet_auth::AccessContext;
///
/// let ctx = AccessContext::from_domains([StaticDomain::new("plugin", Access::READ)]);
/// let err = ctx
///     .check_permission(&ActionPermission::new(Access::WRITE))
///     .unwrap_err();
///
/// assert_eq!(err.denied_by().name, "plugin");
/// assert!(err.to_string().contains("access denied"));
/// ```
#[derive(Debug, Clone, Error)]
pub enum AccessError {
    /// A domain on the effective path does not imply the permission.
    #[error("access denied: '{permission}' is not implied by {denied_by}")]
    Denied {
        /// Rendered form of the permission that was requested.
        permission: String,
        /// Source of the domain that refused.
        denied_by: CodeSource,
    },
}

impl AccessError {
    /// Builds a denial for `perm` refused by `domain`.
    #[must_use]
    pub fn denied(perm: &dyn Permission, domain: &DomainRef) -> Self {
        Self::Denied {
            permission: perm.to_string(),
            denied_by: domain.code_source().clone(),
        }
    }

    /// Returns the rendered permission that was refused.
    #[must_use]
    pub fn permission(&self) -> &str {
        match self {
            Self::Denied { permission, .. } => permission,
        }
    }

    /// Returns the code source of the refusing domain.
    #[must_use]
    pub fn denied_by(&self) -> &CodeSource {
        match self {
            Self::Denied { denied_by, .. } => denied_by,
        }
    }
}

impl ErrorCode for AccessError {
    fn code(&self) -> &'static str {
        match self {
            Self::Denied { .. } => "ACCESS_DENIED",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Needs a broader grant or a privileged scope, not retry.
        false
    }
}

/// A fallible privileged action returned an error.
///
/// Wraps whatever the action failed with so the caller can tell
/// "the action ran and failed" apart from "access machinery refused".
/// Use [`into_inner`](Self::into_inner) to recover the original
/// error.
#[derive(Debug, Error)]
#[error("privileged action failed: {source}")]
pub struct PrivilegedActionError<E: std::error::Error> {
    source: E,
}

impl<E: std::error::Error> PrivilegedActionError<E> {
    /// Wraps an action error.
    #[must_use]
    pub fn new(source: E) -> Self {
        Self { source }
    }

    /// Borrows the action's error.
    #[must_use]
    pub fn cause(&self) -> &E {
        &self.source
    }

    /// Unwraps the action's error.
    #[must_use]
    pub fn into_inner(self) -> E {
        self.source
    }
}

impl<E: std::error::Error> ErrorCode for PrivilegedActionError<E> {
    fn code(&self) -> &'static str {
        "ACCESS_ACTION_FAILED"
    }

    fn is_recoverable(&self) -> bool {
        // Depends on the wrapped error; the wrapper itself does not
        // make the failure permanent.
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Access, ActionPermission, StaticDomain};
    use parapet_types::assert_error_code;

    #[test]
    fn denied_names_permission_and_source() {
        let domain = StaticDomain::new("plugin", Access::READ);
        let err = AccessError::denied(&ActionPermission::new(Access::WRITE), &domain);

        let msg = err.to_string();
        assert!(msg.contains("access denied"), "got: {msg}");
        assert!(msg.contains("WRITE"), "got: {msg}");
        assert_eq!(err.denied_by().name, "plugin");
        assert_eq!(err.permission(), "action:WRITE");
    }

    #[test]
    fn access_error_code() {
        let domain = StaticDomain::new("plugin", Access::empty());
        let err = AccessError::denied(&ActionPermission::new(Access::READ), &domain);

        assert_error_code(&err, "ACCESS_");
        assert_eq!(err.code(), "ACCESS_DENIED");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn privileged_action_error_wraps_and_unwraps() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = PrivilegedActionError::new(inner);

        assert_error_code(&err, "ACCESS_");
        assert_eq!(err.code(), "ACCESS_ACTION_FAILED");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("missing"), "got: {err}");
        assert_eq!(err.cause().kind(), std::io::ErrorKind::NotFound);
        assert_eq!(err.into_inner().kind(), std::io::ErrorKind::NotFound);
    }
}
