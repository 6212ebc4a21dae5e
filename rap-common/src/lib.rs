//! Shared models, collaborator traits and error types for the Rap (Rainbow Action Pipeline)
//! transaction engine.
//!
//! Nothing in this crate talks to the network. The engine in `rap-core` consumes the
//! [`traits::ChainRpc`] and [`traits::Signer`] collaborators defined here, and the planner and
//! executor pass the immutable [`models::action::ActionDescriptor`] values between each other.
pub mod gas;
pub mod models;
pub mod traits;

pub use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
pub use models::error::{ActionError, EstimateGasError, RapError, RpcError, SignerError};

/// Error message sentinel telling the caller a lower layer already informed the user.
///
/// When a [`models::result::RapResult`] carries this value as its error message the UI must not
/// display a second error.
pub const HANDLED_ERROR: &str = "handled";
