//! # Layout Protocol
//!
//! Shared contract between the csv-layout crates and the editor that owns the
//! scene tree.
//!
//! ```text
//! csv records ──> PositionRecord
//!                     │
//! editor ──> SceneHost / AssetDb (async request/response)
//!                     │
//!                     └──> ReconcileReport
//! ```
//!
//! The editor never signals completion of its side effects, so every pause
//! the engine takes goes through [`SettlePolicy`].

use anyhow::Result;
use serde::Serialize;

mod host;
mod memory;
mod record;
mod report;
mod settle;

pub use host::{
    AssetDb, AssetInfo, AssetMeta, ComponentDump, HostError, HostResult, NodeDump, NodeHandle,
    PropertyDump, SceneHost, SceneNode, SceneScript, SubMeta,
};
pub use memory::{HostCall, MemoryBehavior, MemoryHost};
pub use record::{NodeKind, PositionRecord};
pub use report::{ImportOptions, OrderReport, ReconcileOutcome, ReconcileReport};
pub use settle::SettlePolicy;

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
