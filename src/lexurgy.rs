//! Client for the external sound-change engine.
//!
//! The engine is a black box speaking line-delimited JSON (see
//! `protocol`). [`Engine`] is the seam the evolver drives; the real
//! implementation is [`LexurgyClient`], a long-lived child process.
#[cfg(test)]
pub mod fake;
mod process;
mod protocol;
mod trace;

pub use process::LexurgyClient;
pub use protocol::{Changed, EvolveRequest};
pub use trace::TraceLine;

use crate::error::Result;

pub trait Engine {
    /// Run one request to completion.
    fn evolve(&mut self, request: &EvolveRequest) -> Result<Changed>;

    /// Drop any engine state tied to the current rule file. The next
    /// request starts afresh.
    fn reset(&mut self);
}
