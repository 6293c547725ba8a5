//! Planning of engine work.
//!
//! An arranged form becomes a tree of [`Query`] values, each a string plus
//! the rule window it must be evolved through. The planner orders queries
//! in dependency layers and groups each layer by window, so one engine
//! round-trip serves every query of a batch. Identical queries are planned
//! once.
mod plan;
mod query;

pub use plan::{plan, Batch, Plan};
pub use query::{assemble, Query};
