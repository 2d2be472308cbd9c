//! The permission abstraction.
//!
//! A [`Permission`] names a guarded action. The model is open-ended:
//! hosts define their own permission types, and the access machinery
//! only ever asks one question of them — does this permission imply
//! that one?
//!
//! # Implication
//!
//! `implies` is the single comparison primitive. It is expected to be
//! reflexive, but it is *not* symmetric: a wildcard file permission
//! may imply a single-path one without the reverse holding. Everything
//! downstream (domains, contexts, limiting sets) is built on it.
//!
//! # Example
//!
//! ```
//! use std::any::Any;
//! use parapet_auth::Permission;
//!
//! #[derive(Debug)]
//! struct Exec(String);
//!
//! impl std::fmt::Display for Exec {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "exec:{}", self.0)
//!     }
//! }
//!
//! impl Permission for Exec {
//!     fn implies(&self, other: &dyn Permission) -> bool {
//!         other
//!             .as_any()
//!             .downcast_ref::<Exec>()
//!             .is_some_and(|o| self.0 == "*" || self.0 == o.0)
//!     }
//!
//!     fn as_any(&self) -> &dyn Any {
//!         self
//!     }
//! }
//!
//! let all = Exec("*".to_string());
//! let ls = Exec("ls".to_string());
//! assert!(all.implies(&ls));
//! assert!(!ls.implies(&all));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A guarded action that code can be granted or denied.
///
/// Implementations decide their own granularity and wildcard rules;
/// the only contract is [`implies`](Self::implies). `Display` renders
/// the permission for denial messages and audit logs.
///
/// Cross-type comparisons go through [`as_any`](Self::as_any):
/// implementations downcast `other` and return `false` when the type
/// does not match.
pub trait Permission: fmt::Debug + fmt::Display + Send + Sync {
    /// Returns `true` if granting `self` also grants `other`.
    fn implies(&self, other: &dyn Permission) -> bool;

    /// Downcasting seam for cross-type `implies` comparisons.
    fn as_any(&self) -> &dyn Any;
}

/// An ordered collection of permissions with disjunctive implication.
///
/// The set implies a permission if *any* member does. Used for the
/// grants of a domain and for the limiting set of a limited
/// privileged scope. An empty set implies nothing.
///
/// # Example
///
/// ```
/// use parapet_auth::testing::{Access, ActionPermission};
/// use parapet_auth::PermissionSet;
///
/// let set = PermissionSet::of([
///     ActionPermission::arc(Access::READ),
///     ActionPermission::arc(Access::WRITE),
/// ]);
///
/// assert!(set.implies(&ActionPermission::new(Access::READ)));
/// assert!(!set.implies(&ActionPermission::new(Access::EXECUTE)));
/// assert!(!PermissionSet::new().implies(&ActionPermission::new(Access::READ)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    perms: Vec<Arc<dyn Permission>>,
}

impl PermissionSet {
    /// Creates an empty set.
    ///
    /// An empty set implies nothing. As the limiting set of a
    /// privileged scope it disables the scope's privilege entirely.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set from the given permissions.
    #[must_use]
    pub fn of(perms: impl IntoIterator<Item = Arc<dyn Permission>>) -> Self {
        Self {
            perms: perms.into_iter().collect(),
        }
    }

    /// Adds a permission to the set.
    pub fn add(&mut self, perm: Arc<dyn Permission>) {
        self.perms.push(perm);
    }

    /// Returns `true` if any member implies `perm`.
    #[must_use]
    pub fn implies(&self, perm: &dyn Permission) -> bool {
        self.perms.iter().any(|p| p.implies(perm))
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.perms.is_empty()
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.perms.len()
    }

    /// Iterates the members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Permission>> {
        self.perms.iter()
    }
}

impl FromIterator<Arc<dyn Permission>> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Permission>>>(iter: I) -> Self {
        Self::of(iter)
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.perms.is_empty() {
            return write!(f, "(none)");
        }
        for (i, perm) in self.perms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{perm}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Access, ActionPermission};

    #[test]
    fn empty_set_implies_nothing() {
        let set = PermissionSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(!set.implies(&ActionPermission::new(Access::READ)));
    }

    #[test]
    fn any_member_suffices() {
        let mut set = PermissionSet::new();
        set.add(ActionPermission::arc(Access::READ));
        set.add(ActionPermission::arc(Access::WRITE | Access::EXECUTE));

        assert!(set.implies(&ActionPermission::new(Access::READ)));
        assert!(set.implies(&ActionPermission::new(Access::EXECUTE)));
        // No single member grants READ | EXECUTE together.
        assert!(!set.implies(&ActionPermission::new(Access::READ | Access::EXECUTE)));
    }

    #[test]
    fn from_iterator() {
        let set: PermissionSet = [ActionPermission::arc(Access::READ)].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert!(set.implies(&ActionPermission::new(Access::READ)));
    }

    #[test]
    fn display_lists_members() {
        assert_eq!(PermissionSet::new().to_string(), "(none)");

        let set = PermissionSet::of([
            ActionPermission::arc(Access::READ),
            ActionPermission::arc(Access::WRITE),
        ]);
        let rendered = set.to_string();
        assert!(rendered.contains("READ"), "got: {rendered}");
        assert!(rendered.contains(", "), "got: {rendered}");
    }
}
