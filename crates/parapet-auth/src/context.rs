//! Access contexts.
//!
//! An [`AccessContext`] is an immutable snapshot of authorization
//! state: the set of protection domains that must all imply a
//! permission for a check against the snapshot to pass. Contexts are
//! persistent singly-linked chains — extending one shares the whole
//! existing chain, so capturing and restricting contexts is cheap no
//! matter how many snapshots are alive.
//!
//! # Value semantics
//!
//! A context is a *set* of restrictions. Equality ignores insertion
//! order and duplicates, extending with an already-present domain
//! returns the context unchanged, and the unrestricted root domain is
//! never stored (it cannot restrict anything). The chain hash is an
//! XOR fold over member domains, so structurally different chains
//! over the same set hash alike.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::combiner::DomainCombiner;
use crate::domain::{root_domain, DomainRef};
use crate::error::AccessError;
use crate::permission::Permission;

/// Immutable chain of protection domains with set semantics.
///
/// See the [module docs](self) for the value model. Checks against a
/// context are *literal*: every member domain must imply the
/// permission, and an attached combiner is not consulted — combiners
/// are a controller-level concern.
#[derive(Clone)]
pub struct AccessContext {
    node: Arc<Node>,
}

struct Node {
    domain: DomainRef,
    parent: Option<AccessContext>,
    combiner: Option<Arc<dyn DomainCombiner>>,
    hash: u64,
}

static ROOT_CONTEXT: OnceLock<AccessContext> = OnceLock::new();

impl AccessContext {
    /// Returns the unrestricted root context.
    ///
    /// Checks against it always pass. It is the identity for
    /// [`with`](Self::with) and [`intersect`](Self::intersect).
    #[must_use]
    pub fn root() -> Self {
        ROOT_CONTEXT
            .get_or_init(|| {
                let domain = root_domain();
                let hash = domain.as_dyn().domain_hash();
                Self {
                    node: Arc::new(Node {
                        domain,
                        parent: None,
                        combiner: None,
                        hash,
                    }),
                }
            })
            .clone()
    }

    /// Builds a context restricted by the given domains.
    ///
    /// Equivalent to `AccessContext::root().with_all(domains)`.
    #[must_use]
    pub fn from_domains(domains: impl IntoIterator<Item = DomainRef>) -> Self {
        Self::root().with_all(domains)
    }

    /// Returns this context additionally restricted by `domain`.
    ///
    /// Adding a domain already in the set (or the unrestricted root
    /// sentinel) returns the receiver unchanged, so repeated
    /// extension is idempotent and allocation-free.
    #[must_use]
    pub fn with(&self, domain: DomainRef) -> Self {
        self.extend(domain, false)
    }

    /// Like [`with`](Self::with), but a freshly allocated head keeps
    /// the receiver's combiner instead of dropping it.
    #[must_use]
    pub(crate) fn with_kept_combiner(&self, domain: DomainRef) -> Self {
        self.extend(domain, true)
    }

    fn extend(&self, domain: DomainRef, keep_combiner: bool) -> Self {
        if self.contains(&domain) {
            return self.clone();
        }
        let hash = self.node.hash ^ domain.as_dyn().domain_hash();
        let combiner = if keep_combiner {
            self.node.combiner.clone()
        } else {
            None
        };
        Self {
            node: Arc::new(Node {
                domain,
                parent: Some(self.clone()),
                combiner,
                hash,
            }),
        }
    }

    /// Returns this context restricted by every given domain.
    #[must_use]
    pub fn with_all(&self, domains: impl IntoIterator<Item = DomainRef>) -> Self {
        domains.into_iter().fold(self.clone(), |acc, d| acc.with(d))
    }

    /// Returns the union of restrictions of both contexts.
    ///
    /// The result denies whatever either input would deny. The
    /// receiver's chain is reused; the argument's domains are folded
    /// on top.
    #[must_use]
    pub fn intersect(&self, other: &AccessContext) -> Self {
        let mut acc = self.clone();
        let mut cur = Some(other);
        while let Some(ctx) = cur {
            acc = acc.with(ctx.node.domain.clone());
            cur = ctx.node.parent.as_ref();
        }
        acc
    }

    /// Returns this context with `combiner` attached.
    ///
    /// The restriction set — and therefore equality and hashing — is
    /// unchanged; only the combiner slot differs.
    #[must_use]
    pub fn with_combiner(&self, combiner: Arc<dyn DomainCombiner>) -> Self {
        Self {
            node: Arc::new(Node {
                domain: self.node.domain.clone(),
                parent: Some(self.clone()),
                combiner: Some(combiner),
                hash: self.node.hash,
            }),
        }
    }

    /// Returns the attached combiner, if any.
    #[must_use]
    pub fn combiner(&self) -> Option<&Arc<dyn DomainCombiner>> {
        self.node.combiner.as_ref()
    }

    /// Returns `true` if `domain` is in the restriction set.
    ///
    /// The unrestricted root sentinel is vacuously contained: it
    /// restricts nothing, so every context already "holds" it.
    #[must_use]
    pub fn contains(&self, domain: &DomainRef) -> bool {
        if domain.is_unrestricted() {
            return true;
        }
        let mut cur = Some(self);
        while let Some(ctx) = cur {
            if ctx.node.domain == *domain {
                return true;
            }
            cur = ctx.node.parent.as_ref();
        }
        false
    }

    /// Returns the member domains, innermost extension first.
    ///
    /// Duplicates and the unrestricted root sentinel are skipped, so
    /// the root context yields an empty list.
    #[must_use]
    pub fn domains(&self) -> Vec<DomainRef> {
        let mut out: Vec<DomainRef> = Vec::new();
        let mut cur = Some(self);
        while let Some(ctx) = cur {
            let d = &ctx.node.domain;
            if !d.is_unrestricted() && !out.contains(d) {
                out.push(d.clone());
            }
            cur = ctx.node.parent.as_ref();
        }
        out
    }

    /// Checks `perm` against every member domain.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Denied`] naming the first (innermost)
    /// domain whose grants do not imply `perm`.
    pub fn check_permission(&self, perm: &dyn Permission) -> Result<(), AccessError> {
        let mut cur = Some(self);
        while let Some(ctx) = cur {
            if !ctx.node.domain.implies(perm) {
                return Err(AccessError::denied(perm, &ctx.node.domain));
            }
            cur = ctx.node.parent.as_ref();
        }
        Ok(())
    }

    /// Returns `true` if every domain in `other` is in this set.
    ///
    /// A chain suffix shared by both contexts short-circuits: a
    /// shared tail's domains are trivially present on both sides.
    fn contains_all(&self, other: &AccessContext) -> bool {
        let mut ocur = Some(other);
        while let Some(octx) = ocur {
            let mut found = false;
            let mut cur = Some(self);
            while let Some(ctx) = cur {
                if Arc::ptr_eq(&ctx.node, &octx.node) {
                    return true;
                }
                if ctx.node.domain == octx.node.domain {
                    found = true;
                    break;
                }
                cur = ctx.node.parent.as_ref();
            }
            if !found {
                return false;
            }
            ocur = octx.node.parent.as_ref();
        }
        true
    }
}

impl PartialEq for AccessContext {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.node, &other.node) {
            return true;
        }
        // XOR-folded hashes of equal sets agree, so a mismatch is a
        // cheap definite inequality.
        self.node.hash == other.node.hash
            && self.contains_all(other)
            && other.contains_all(self)
    }
}

impl Eq for AccessContext {}

impl Hash for AccessContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.node.hash);
    }
}

impl fmt::Debug for AccessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessContext")
            .field("domains", &self.domains())
            .field("has_combiner", &self.combiner().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Access, ActionPermission, StaticDomain};

    fn read() -> ActionPermission {
        ActionPermission::new(Access::READ)
    }

    #[test]
    fn root_allows_everything() {
        let root = AccessContext::root();
        assert!(root
            .check_permission(&ActionPermission::new(Access::ALL))
            .is_ok());
        assert!(root.domains().is_empty());
    }

    #[test]
    fn with_is_idempotent() {
        let d = StaticDomain::new("core", Access::READ);
        let once = AccessContext::root().with(d.clone());
        let twice = once.with(d.clone());

        assert_eq!(once, twice);
        assert_eq!(twice.domains().len(), 1);
    }

    #[test]
    fn with_root_sentinel_is_noop() {
        let base = AccessContext::root().with(StaticDomain::new("core", Access::READ));
        let extended = base.with(root_domain());
        assert_eq!(base, extended);
        assert_eq!(extended.domains().len(), 1);
    }

    #[test]
    fn equality_ignores_order_and_duplicates() {
        let a = StaticDomain::new("a", Access::READ);
        let b = StaticDomain::new("b", Access::WRITE);

        let ab = AccessContext::from_domains([a.clone(), b.clone()]);
        let ba = AccessContext::from_domains([b.clone(), a.clone()]);
        let aab = AccessContext::from_domains([a.clone(), a.clone(), b.clone()]);

        assert_eq!(ab, ba);
        assert_eq!(ab, aab);
        assert_ne!(ab, AccessContext::from_domains([a]));
    }

    #[test]
    fn equal_contexts_hash_alike() {
        use std::collections::hash_map::DefaultHasher;

        let a = StaticDomain::new("a", Access::READ);
        let b = StaticDomain::new("b", Access::WRITE);
        let ab = AccessContext::from_domains([a.clone(), b.clone()]);
        let ba = AccessContext::from_domains([b, a]);

        let hash = |ctx: &AccessContext| {
            let mut h = DefaultHasher::new();
            ctx.hash(&mut h);
            h.finish()
        };
        assert_eq!(hash(&ab), hash(&ba));
    }

    #[test]
    fn shared_tail_equality() {
        let base = AccessContext::root().with(StaticDomain::new("a", Access::READ));
        let left = base.with(StaticDomain::new("b", Access::WRITE));
        let right = base.with(StaticDomain::new("b", Access::WRITE));
        // Distinct heads over a shared tail, same set.
        assert_eq!(left, right);
    }

    #[test]
    fn check_denies_at_first_failing_domain() {
        let inner = StaticDomain::new("inner", Access::empty());
        let outer = StaticDomain::new("outer", Access::empty());
        // Chain is built outermost-first; head is innermost.
        let ctx = AccessContext::root().with(outer).with(inner);

        let err = ctx.check_permission(&read()).unwrap_err();
        assert_eq!(err.denied_by().name, "inner");
    }

    #[test]
    fn check_passes_when_all_imply() {
        let ctx = AccessContext::from_domains([
            StaticDomain::new("a", Access::READ | Access::WRITE),
            StaticDomain::new("b", Access::READ),
        ]);
        assert!(ctx.check_permission(&read()).is_ok());
        assert!(ctx
            .check_permission(&ActionPermission::new(Access::WRITE))
            .is_err());
    }

    #[test]
    fn intersect_unions_restrictions() {
        let a = StaticDomain::new("a", Access::READ);
        let b = StaticDomain::new("b", Access::READ);

        let left = AccessContext::from_domains([a.clone()]);
        let right = AccessContext::from_domains([b.clone()]);
        let both = left.intersect(&right);

        assert_eq!(both, AccessContext::from_domains([a, b]));
        // Intersection with self is identity.
        assert_eq!(left.intersect(&left.clone()), left);
    }

    #[test]
    fn combiner_attachment_preserves_equality() {
        #[derive(Debug)]
        struct Noop;
        impl crate::DomainCombiner for Noop {
            fn combine(&self, current: &[DomainRef], _assigned: &[DomainRef]) -> Vec<DomainRef> {
                current.to_vec()
            }
        }

        let plain = AccessContext::from_domains([StaticDomain::new("a", Access::READ)]);
        let combined = plain.with_combiner(Arc::new(Noop));

        assert_eq!(plain, combined);
        assert!(plain.combiner().is_none());
        assert!(combined.combiner().is_some());
        assert_eq!(plain.domains(), combined.domains());
    }

    #[test]
    fn contains_respects_structural_equality() {
        let ctx = AccessContext::from_domains([StaticDomain::new("a", Access::READ)]);
        // A separately built equal domain is contained.
        assert!(ctx.contains(&StaticDomain::new("a", Access::READ)));
        assert!(!ctx.contains(&StaticDomain::new("b", Access::READ)));
        assert!(ctx.contains(&root_domain()));
    }

    #[test]
    fn domains_innermost_first() {
        let a = StaticDomain::new("a", Access::READ);
        let b = StaticDomain::new("b", Access::WRITE);
        let ctx = AccessContext::root().with(a.clone()).with(b.clone());
        assert_eq!(ctx.domains(), vec![b, a]);
    }
}
