//! Protection domains.
//!
//! A [`ProtectionDomain`] groups code (a [`CodeSource`]) with what
//! that code is allowed to do. Domains are the unit a permission
//! check walks over: every domain on the effective path must imply
//! the requested permission.
//!
//! # Equality
//!
//! Domain equality is identity-or-structural: two [`DomainRef`]s are
//! equal when they point at the same allocation, or when the
//! implementation's [`domain_eq`](ProtectionDomain::domain_eq) says
//! the values are interchangeable. Implementations compare only
//! against their own concrete type and answer `false` otherwise.
//! `domain_hash` must agree with `domain_eq` for context hashing to
//! stay consistent.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parapet_types::CodeSource;

use crate::permission::{Permission, PermissionSet};

/// A code source plus the permissions granted to it.
///
/// Implementations are free to resolve grants however they like
/// (static tables, policy files, dynamic revocation). The walk only
/// asks [`implies`](Self::implies).
pub trait ProtectionDomain: fmt::Debug + Send + Sync {
    /// Returns `true` if this domain's grants imply `perm`.
    fn implies(&self, perm: &dyn Permission) -> bool;

    /// Returns the code source this domain attributes.
    fn code_source(&self) -> &CodeSource;

    /// Structural equality against another domain.
    ///
    /// Called only after an identity check failed. Implementations
    /// should downcast `other` via [`as_any`](Self::as_any) and
    /// return `false` for foreign types.
    fn domain_eq(&self, other: &dyn ProtectionDomain) -> bool;

    /// Hash consistent with [`domain_eq`](Self::domain_eq).
    fn domain_hash(&self) -> u64;

    /// Downcasting seam for [`domain_eq`](Self::domain_eq).
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a protection domain.
///
/// `DomainRef` is what contexts and frames actually hold. It makes
/// trait-object domains usable as set members: `PartialEq` tries
/// pointer identity first and falls back to
/// [`domain_eq`](ProtectionDomain::domain_eq), and `Hash` forwards to
/// [`domain_hash`](ProtectionDomain::domain_hash).
#[derive(Clone)]
pub struct DomainRef(Arc<dyn ProtectionDomain>);

impl DomainRef {
    /// Wraps a concrete domain.
    #[must_use]
    pub fn new<D: ProtectionDomain + 'static>(domain: D) -> Self {
        Self(Arc::new(domain))
    }

    /// Wraps an already shared domain.
    #[must_use]
    pub fn from_arc(domain: Arc<dyn ProtectionDomain>) -> Self {
        Self(domain)
    }

    /// Returns `true` if the domain's grants imply `perm`.
    #[must_use]
    pub fn implies(&self, perm: &dyn Permission) -> bool {
        self.0.implies(perm)
    }

    /// Returns the code source this domain attributes.
    #[must_use]
    pub fn code_source(&self) -> &CodeSource {
        self.0.code_source()
    }

    /// Returns `true` if this is the process-wide unrestricted root
    /// sentinel (or an equal instance).
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        *self == root_domain()
    }

    /// Borrows the underlying trait object.
    #[must_use]
    pub fn as_dyn(&self) -> &dyn ProtectionDomain {
        self.0.as_ref()
    }
}

impl fmt::Debug for DomainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for DomainRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "domain[{}]", self.code_source())
    }
}

impl PartialEq for DomainRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.domain_eq(other.0.as_ref())
    }
}

impl Eq for DomainRef {}

impl Hash for DomainRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.domain_hash());
    }
}

// ============================================
// Root Sentinel
// ============================================

/// The unrestricted root domain.
///
/// Implies every permission and compares equal to any other root
/// instance. Contexts never store it: adding it to a context is a
/// no-op because an unrestricted domain cannot contribute a
/// restriction.
#[derive(Debug)]
struct RootDomain {
    source: CodeSource,
}

impl ProtectionDomain for RootDomain {
    fn implies(&self, _perm: &dyn Permission) -> bool {
        true
    }

    fn code_source(&self) -> &CodeSource {
        &self.source
    }

    fn domain_eq(&self, other: &dyn ProtectionDomain) -> bool {
        other.as_any().is::<RootDomain>()
    }

    fn domain_hash(&self) -> u64 {
        self.source.uuid.as_u128() as u64
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

static ROOT: OnceLock<DomainRef> = OnceLock::new();

/// Returns the process-wide unrestricted root domain.
#[must_use]
pub fn root_domain() -> DomainRef {
    ROOT.get_or_init(|| {
        DomainRef::new(RootDomain {
            source: CodeSource::platform("root"),
        })
    })
    .clone()
}

// ============================================
// Granted Domain
// ============================================

static GRANT_INSTANCES: AtomicU64 = AtomicU64::new(0);

/// A domain granting exactly one [`PermissionSet`] to one source.
///
/// This is the synthetic domain a limited privileged scope installs:
/// it implies a permission precisely when its limiting set does, so
/// stacking it onto a context caps what the scope can assert.
///
/// Permissions are opaque trait objects with no structural equality,
/// so each `GrantedDomain` carries a process-unique instance number:
/// a granted domain is equal only to itself (and clones of the same
/// instance). That keeps two scopes with textually identical limits
/// distinct, which is the conservative direction.
#[derive(Debug, Clone)]
pub struct GrantedDomain {
    source: CodeSource,
    grants: PermissionSet,
    instance: u64,
}

impl GrantedDomain {
    /// Creates a domain granting `grants` to `source`.
    #[must_use]
    pub fn new(source: CodeSource, grants: PermissionSet) -> Self {
        Self {
            source,
            grants,
            instance: GRANT_INSTANCES.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Returns the granted permissions.
    #[must_use]
    pub fn grants(&self) -> &PermissionSet {
        &self.grants
    }
}

impl ProtectionDomain for GrantedDomain {
    fn implies(&self, perm: &dyn Permission) -> bool {
        self.grants.implies(perm)
    }

    fn code_source(&self) -> &CodeSource {
        &self.source
    }

    fn domain_eq(&self, other: &dyn ProtectionDomain) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| self.instance == o.instance)
    }

    fn domain_hash(&self) -> u64 {
        (self.source.uuid.as_u128() as u64) ^ self.instance
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
