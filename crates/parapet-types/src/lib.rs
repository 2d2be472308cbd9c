//! Core types for Parapet.
//!
//! This crate provides the foundational identifier types and error
//! conventions for the Parapet stack-scoped access-control library.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Foundation Layer                         │
//! │  (SemVer stable, safe for hosts and domain implementors)     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  parapet-types : CodeSource, FrameId, ErrorCode  ◄── HERE    │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Access-Control Layer                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  parapet-auth  : Permission, ProtectionDomain,               │
//! │                  AccessContext, AccessController             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identifier Design
//!
//! [`CodeSource`] is UUID-based for:
//!
//! - **Attribution**: denial errors and audit records name a stable
//!   identity, not a display string
//! - **Determinism where it matters**: platform sources derive their
//!   UUID from their name, host-loaded sources get a random one
//! - **Serialization**: first-class serde support
//!
//! [`FrameId`] is the one deliberately process-local type: it numbers
//! individual stack-frame activations so memoized per-frame results
//! can never alias across activations.
//!
//! # Example
//!
//! ```
//! use parapet_types::{CodeSource, FrameId};
//!
//! // Platform sources have deterministic UUIDs
//! let core = CodeSource::platform("core");
//! assert_eq!(core, CodeSource::platform("core"));
//!
//! // Host-loaded sources get random UUIDs
//! let plugin = CodeSource::new("plugin-a");
//!
//! // Frame activations never repeat
//! let f1 = FrameId::next(&plugin);
//! let f2 = FrameId::next(&plugin);
//! assert_ne!(f1, f2);
//! ```

mod error;
mod source;

pub use error::{assert_error_code, ErrorCode};
pub use source::{CodeSource, FrameId};
