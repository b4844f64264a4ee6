//! Composer Transport Layer
//!
//! Network access for the script composer.
//!
//! This crate provides:
//! - [`rest`]: blocking REST client for a fullnode (modules, accounts, ledger info, gas price)
//! - [`network`]: network selection and endpoint resolution
//!
//! # Example
//!
//! ```ignore
//! use composer_transport::{FullnodeClient, Network};
//!
//! let client = FullnodeClient::for_network(Network::Testnet)?;
//! let coin = client.get_module(&AccountAddress::ONE, "coin", None)?;
//! ```

pub mod network;
pub mod rest;

pub use network::{resolve_fullnode_endpoint, Network};
pub use rest::{AccountInfo, FullnodeClient, GasEstimation, LedgerInfo};
