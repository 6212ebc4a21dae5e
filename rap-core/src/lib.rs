//! Planning and execution of Raps.
//!
//! [`RapEngine`] is the entry point: it plans an intent with the [`planner::RapPlanner`], then
//! drives each action through the [`executor::ActionExecutor`] in order and reports a single
//! [`rap_common::models::result::RapResult`].
pub mod config;
pub mod engine;
pub mod executor;
pub mod gas;
pub mod nonce;
pub mod planner;

#[cfg(test)]
mod testing;

pub use config::{ChainConfig, EngineConfig};
pub use engine::{RapEngine, RapState};
