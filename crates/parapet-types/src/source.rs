//! Identifier types for Parapet.
//!
//! Code sources are UUID-based so they stay meaningful across
//! processes and in serialized audit records.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// Parapet namespace UUID for deterministic UUID v5 generation.
///
/// Used as the namespace for platform-defined code sources so the
/// same name resolves to the same UUID in every process.
const PARAPET_NAMESPACE: Uuid = uuid!("6f2c41da-88f3-4c57-9a0e-1d34b8a6c9e2");

/// Identifies a unit of code that can be granted permissions.
///
/// A `CodeSource` is the attribution handle of the access-control
/// model: protection domains carry one, denial errors name the source
/// of the domain that refused, and limited privilege scopes mint
/// synthetic domains attributed to the calling source.
///
/// # UUID Strategy
///
/// - **Platform sources**: UUID v5 (deterministic from name)
/// - **Host-loaded sources**: UUID v4 (random per load)
///
/// Deterministic platform UUIDs make trusted sources comparable
/// across processes; random UUIDs keep separately loaded code units
/// distinct even when they share a name.
///
/// # Example
///
/// ```
/// use parapet_types::CodeSource;
///
/// // Platform: deterministic UUID
/// let core1 = CodeSource::platform("core");
/// let core2 = CodeSource::platform("core");
/// assert_eq!(core1, core2);
///
/// // Host-loaded: random UUID per load
/// let p1 = CodeSource::new("plugin-a");
/// let p2 = CodeSource::new("plugin-a");
/// assert_ne!(p1, p2);       // Different loads
/// assert_eq!(p1.name, p2.name);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeSource {
    /// Globally unique identifier.
    pub uuid: Uuid,
    /// Human-readable source name (e.g., "core", "plugin-a").
    pub name: String,
}

impl CodeSource {
    /// Creates a new [`CodeSource`] with a random UUID v4.
    ///
    /// Use this for host-loaded code where each load should have a
    /// distinct identity.
    ///
    /// # Example
    ///
    /// ```
    /// use parapet_types::CodeSource;
    ///
    /// let src = CodeSource::new("plugin-a");
    /// assert_eq!(src.name, "plugin-a");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
        }
    }

    /// Creates a platform code source with a deterministic UUID v5.
    ///
    /// The UUID is derived from the Parapet namespace UUID and the
    /// source name using SHA-1, so the same name always produces the
    /// same UUID in every process.
    ///
    /// # Example
    ///
    /// ```
    /// use parapet_types::CodeSource;
    ///
    /// let a = CodeSource::platform("core");
    /// let b = CodeSource::platform("core");
    /// let c = CodeSource::platform("io");
    ///
    /// assert_eq!(a.uuid, b.uuid);
    /// assert_ne!(a.uuid, c.uuid);
    /// ```
    #[must_use]
    pub fn platform(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uuid: Uuid::new_v5(&PARAPET_NAMESPACE, name.as_bytes()),
            name,
        }
    }

    /// Returns the deterministic source for code with no identity.
    ///
    /// Limited privilege scopes entered from a stack with no annotated
    /// frames attribute their limiting domain to this source.
    #[must_use]
    pub fn unattributed() -> Self {
        Self::platform("unattributed")
    }

    /// Returns `true` if this source's UUID is namespace-derived,
    /// i.e. it was created with [`platform`](Self::platform).
    #[must_use]
    pub fn is_platform(&self) -> bool {
        self.uuid == Uuid::new_v5(&PARAPET_NAMESPACE, self.name.as_bytes())
    }
}

impl std::fmt::Display for CodeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "src:{}@{}", self.name, self.uuid)
    }
}

/// Process-global activation counter backing [`FrameId::next`].
static ACTIVATIONS: AtomicU64 = AtomicU64::new(0);

/// Identifier for one stack-frame activation.
///
/// A `FrameId` pairs the frame's code-source UUID with a
/// process-global activation number, so two activations of the same
/// call site never share an id. This is what makes memoizing a
/// frame's outward context sound: an entry keyed by a `FrameId` can
/// only ever describe the one activation it was computed for.
///
/// `FrameId` is deliberately not serializable — activation numbers
/// are meaningless outside the process that issued them.
///
/// # Example
///
/// ```
/// use parapet_types::{CodeSource, FrameId};
///
/// let src = CodeSource::platform("core");
/// let a = FrameId::next(&src);
/// let b = FrameId::next(&src);
/// assert_ne!(a, b);             // Same site, distinct activations
/// assert_eq!(a.code(), b.code());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    code: Uuid,
    activation: u64,
}

// NOTE: FrameId intentionally does NOT implement Default.
// An activation id is meaningless without the code source it was
// issued for; use FrameId::next(&source).
impl FrameId {
    /// Issues the next activation id for the given code source.
    #[must_use]
    pub fn next(source: &CodeSource) -> Self {
        Self {
            code: source.uuid,
            activation: ACTIVATIONS.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Returns the code-source UUID this activation belongs to.
    #[must_use]
    pub fn code(&self) -> Uuid {
        self.code
    }

    /// Returns the process-global activation number.
    #[must_use]
    pub fn activation(&self) -> u64 {
        self.activation
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame:{}@{}", self.activation, self.code)
    }
}

// Tests are in lib.rs as integration tests for public API
