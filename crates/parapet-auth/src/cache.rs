//! Frame-result memoization.
//!
//! [`FrameCache`] remembers, per stack-frame activation, the context
//! implied by everything outward of that frame. A later walk that
//! reaches a memoized frame can stop and delegate to the stored
//! context instead of visiting the rest of the stack.
//!
//! Keys are [`FrameId`]s, which are unique per activation, so an
//! entry can never describe a different path through the same call
//! site and entries never need eviction for correctness. [`clear`]
//! exists for memory pressure only.
//!
//! [`clear`]: FrameCache::clear

use std::collections::HashMap;
use std::sync::RwLock;

use parapet_types::FrameId;
use tracing::error;

use crate::context::AccessContext;

/// Shared memo of frame activation → outward context.
///
/// Lock poisoning is degraded, never propagated: a poisoned read is
/// a miss, a poisoned write drops the entry. The cache only ever
/// affects performance, so losing it is safe.
#[derive(Debug, Default)]
pub struct FrameCache {
    entries: RwLock<HashMap<FrameId, AccessContext>>,
}

impl FrameCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the memoized outward context for `id`.
    #[must_use]
    pub fn get(&self, id: &FrameId) -> Option<AccessContext> {
        match self.entries.read() {
            Ok(entries) => entries.get(id).cloned(),
            Err(e) => {
                error!("frame cache lock poisoned on read, treating as miss: {e}");
                None
            }
        }
    }

    /// Memoizes the outward context for `id`. Last write wins.
    pub fn insert(&self, id: FrameId, context: AccessContext) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(id, context);
            }
            Err(e) => {
                error!("frame cache lock poisoned on write, dropping entry: {e}");
            }
        }
    }

    /// Returns the number of memoized frames.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(e) => {
                error!("frame cache lock poisoned on len: {e}");
                0
            }
        }
    }

    /// Returns `true` if nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut entries) => entries.clear(),
            Err(e) => {
                error!("frame cache lock poisoned on clear: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Access, StaticDomain};
    use parapet_types::CodeSource;

    fn ctx(name: &str) -> AccessContext {
        AccessContext::from_domains([StaticDomain::new(name, Access::READ)])
    }

    #[test]
    fn miss_then_hit() {
        let cache = FrameCache::new();
        let id = FrameId::next(&CodeSource::platform("core"));

        assert!(cache.get(&id).is_none());
        cache.insert(id, ctx("a"));
        assert_eq!(cache.get(&id), Some(ctx("a")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn entries_keyed_per_activation() {
        let cache = FrameCache::new();
        let src = CodeSource::platform("core");
        let first = FrameId::next(&src);
        let second = FrameId::next(&src);

        cache.insert(first, ctx("a"));
        // A later activation of the same site is a distinct key.
        assert!(cache.get(&second).is_none());
    }

    #[test]
    fn last_write_wins() {
        let cache = FrameCache::new();
        let id = FrameId::next(&CodeSource::platform("core"));

        cache.insert(id, ctx("a"));
        cache.insert(id, ctx("b"));
        assert_eq!(cache.get(&id), Some(ctx("b")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_empties() {
        let cache = FrameCache::new();
        cache.insert(FrameId::next(&CodeSource::platform("core")), ctx("a"));
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }
}
