//! Domain combiners.
//!
//! A [`DomainCombiner`] is the hook through which a host rewrites the
//! domains a check would otherwise consult — the classic use is
//! substituting a subject's domains when code runs "as" someone.
//!
//! When the thread's inherited context carries a combiner, the
//! controller skips the normal stack walk entirely: it hands the
//! combiner the ordinary domains of the whole stack and checks the
//! combined result instead. See
//! [`AccessController::check_permission`](crate::AccessController::check_permission).

use std::fmt;

use crate::domain::DomainRef;

/// Maps the domains in play to the domains that should be checked.
///
/// `current` holds the domains the walk would have consulted,
/// innermost first; `assigned` holds domains already attached to the
/// context being combined into (empty for the check-time bypass).
/// The returned list replaces both.
///
/// Implementations may drop, reorder, deduplicate, or substitute
/// domains. Returning `current.to_vec()` makes the combiner a no-op
/// apart from disabling memoization for the decision.
pub trait DomainCombiner: fmt::Debug + Send + Sync {
    /// Combines two domain lists into the list to check.
    fn combine(&self, current: &[DomainRef], assigned: &[DomainRef]) -> Vec<DomainRef>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Access, ActionPermission, StaticDomain};

    #[derive(Debug)]
    struct Substituting {
        replacement: DomainRef,
    }

    impl DomainCombiner for Substituting {
        fn combine(&self, _current: &[DomainRef], _assigned: &[DomainRef]) -> Vec<DomainRef> {
            vec![self.replacement.clone()]
        }
    }

    #[test]
    fn combiner_replaces_domains() {
        let replacement = StaticDomain::new("subject", Access::READ);
        let combiner = Substituting {
            replacement: replacement.clone(),
        };

        let current = [StaticDomain::new("caller", Access::empty())];
        let combined = combiner.combine(&current, &[]);

        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0], replacement);
        assert!(combined[0].implies(&ActionPermission::new(Access::READ)));
    }
}
