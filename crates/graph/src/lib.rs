//! # Layout Graph
//!
//! Name lookup over one snapshot of the editor's scene tree.
//!
//! ## Architecture
//!
//! ```text
//! query-node-tree snapshot
//!     │
//!     ├──> TargetIndex (name -> [handle, full path], traversal order)
//!     │      └─ local inserts for nodes created during the run
//!     │
//!     └──> find_anchor (parent for root-level records)
//! ```
//!
//! The index is never refreshed from the editor after it is built; only the
//! engine's own creations are added to it.

mod anchor;
mod index;

pub use anchor::{find_anchor, DEFAULT_ANCHOR_NAME};
pub use index::{TargetEntry, TargetIndex};
