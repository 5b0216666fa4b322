//! # Layout Engine
//!
//! Applies a CSV layout to an editor scene.
//!
//! ## Run
//!
//! ```text
//! CSV file
//!     │
//!     ├──> load_records ──> Grouping (by parent path)
//!     │
//!     ├──> query-node-tree ──> TargetIndex + anchor
//!     │
//!     ├──> ResourceImporter (optional)
//!     │      └─> ImageMap ──> SpriteFrameResolver
//!     │
//!     ├──> Reconciler (update / create / bind sprite)
//!     │
//!     └──> OrderEnforcer (sibling order = CSV order)
//!            └─> ReconcileReport
//! ```
//!
//! Host calls are issued one at a time. Fixed pauses come from
//! [`SettlePolicy`](layout_protocol::SettlePolicy) and nowhere else.

mod binding;
mod error;
mod fallback;
mod order;
mod reconciler;
mod resolver;
mod sync;

pub use binding::{BindingProfile, SpriteBinder};
pub use error::{ImportError, Result};
pub use fallback::{accepted, first_success, Strategy};
pub use order::OrderEnforcer;
pub use reconciler::{ImageBindings, Reconciler};
pub use resolver::SpriteFrameResolver;
pub use sync::LayoutSync;
