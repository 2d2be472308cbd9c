//! Concrete permission and domain doubles.
//!
//! The core model is trait-only: [`Permission`](crate::Permission) and
//! [`ProtectionDomain`](crate::ProtectionDomain) say nothing about
//! what is being guarded. This module ships one small concrete family
//! so hosts can integration-test their wiring (and this crate can test
//! itself) without first building a real permission model.
//!
//! # Example
//!
//! ```
//! use parapet_auth::testing::{Access, ActionPermission, StaticDomain};
//!
//! let domain = StaticDomain::new("core", Access::READ | Access::WRITE);
//! assert!(domain.implies(&ActionPermission::new(Access::READ)));
//! assert!(!domain.implies(&ActionPermission::new(Access::EXECUTE)));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use parapet_types::CodeSource;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainRef, ProtectionDomain};
use crate::permission::Permission;

bitflags! {
    /// Access kinds for [`ActionPermission`].
    ///
    /// | Flag | Guards |
    /// |------|--------|
    /// | [`READ`](Self::READ) | reading guarded state |
    /// | [`WRITE`](Self::WRITE) | mutating guarded state |
    /// | [`EXECUTE`](Self::EXECUTE) | running guarded operations |
    /// | [`NETWORK`](Self::NETWORK) | opening connections |
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Access: u8 {
        /// Read guarded state.
        const READ    = 0b0000_0001;
        /// Mutate guarded state.
        const WRITE   = 0b0000_0010;
        /// Run guarded operations.
        const EXECUTE = 0b0000_0100;
        /// Open connections.
        const NETWORK = 0b0000_1000;
    }
}

impl Access {
    /// All access kinds.
    pub const ALL: Self = Self::READ
        .union(Self::WRITE)
        .union(Self::EXECUTE)
        .union(Self::NETWORK);

    /// Returns a human-readable list of flag names.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(none)");
        }
        write!(f, "{}", self.names().join("|"))
    }
}

/// Bitflag-backed permission: `self` implies `other` when it holds
/// every flag `other` asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionPermission {
    access: Access,
}

impl ActionPermission {
    /// Creates a permission requiring the given access kinds.
    #[must_use]
    pub fn new(access: Access) -> Self {
        Self { access }
    }

    /// Creates a permission already boxed for set membership.
    #[must_use]
    pub fn arc(access: Access) -> Arc<dyn Permission> {
        Arc::new(Self::new(access))
    }

    /// Returns the required access kinds.
    #[must_use]
    pub fn access(&self) -> Access {
        self.access
    }
}

impl fmt::Display for ActionPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action:{}", self.access)
    }
}

impl Permission for ActionPermission {
    fn implies(&self, other: &dyn Permission) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| self.access.contains(o.access))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Protection domain granting a fixed [`Access`] set.
///
/// Equality is structural (same source, same grants), so two
/// independently built `StaticDomain`s with the same platform name
/// and grants compare equal — which is what context set-equality
/// tests need.
#[derive(Debug, Clone)]
pub struct StaticDomain {
    source: CodeSource,
    grants: Access,
}

impl StaticDomain {
    /// Creates a domain for the platform source `name` wrapped in a
    /// [`DomainRef`].
    ///
    /// The source is deterministic, so the same `(name, grants)` pair
    /// always yields an equal domain.
    #[must_use]
    pub fn new(name: &str, grants: Access) -> DomainRef {
        DomainRef::new(Self {
            source: CodeSource::platform(name),
            grants,
        })
    }

    /// Creates a domain for an explicit source.
    #[must_use]
    pub fn with_source(source: CodeSource, grants: Access) -> DomainRef {
        DomainRef::new(Self { source, grants })
    }

    /// Returns the granted access kinds.
    #[must_use]
    pub fn grants(&self) -> Access {
        self.grants
    }
}

impl ProtectionDomain for StaticDomain {
    fn implies(&self, perm: &dyn Permission) -> bool {
        perm.as_any()
            .downcast_ref::<ActionPermission>()
            .is_some_and(|p| self.grants.contains(p.access()))
    }

    fn code_source(&self) -> &CodeSource {
        &self.source
    }

    fn domain_eq(&self, other: &dyn ProtectionDomain) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| self.source == o.source && self.grants == o.grants)
    }

    fn domain_hash(&self) -> u64 {
        (self.source.uuid.as_u128() as u64) ^ u64::from(self.grants.bits())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
