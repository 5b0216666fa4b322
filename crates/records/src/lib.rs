//! # Layout Records
//!
//! Turns a positions CSV into ordered [`PositionRecord`]s and groups them by
//! declared parent.
//!
//! ```text
//! file ──> strip BOM ──> split lines ──> PositionRecord[] ──> Grouping
//!                                            (input order)     (parent -> children)
//! ```

mod error;
mod grouping;
mod parser;

pub use error::{RecordsError, Result};
pub use grouping::{GroupKey, Grouping};
pub use layout_protocol::{NodeKind, PositionRecord};
pub use parser::{load_records, parse_records, split_line, strip_bom};
