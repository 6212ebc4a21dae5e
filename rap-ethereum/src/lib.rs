#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod calls;
pub mod rpc;

pub use rpc::{config::RPCRetryConfig, RetryingChainRpc};
