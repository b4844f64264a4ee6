//! Shared types for the script-composer workspace.
//!
//! This crate provides the data model shared by the transport layer and the
//! composer core, so neither has to depend on the other:
//!
//! - [`address`]: address parsing and canonical (AIP-40) formatting
//! - [`module_id`]: [`ModuleIdentifier`] and [`FunctionId`]
//! - [`abi`]: module ABI and bytecode as returned by a fullnode
//! - [`type_parsing`]: type tag / ABI type string parsing and formatting
//! - [`call`]: batched-call arguments ([`CallArgument`], [`FunctionArgument`])
//! - [`transaction`]: script payload and raw transaction envelopes
//! - [`env_utils`]: environment variable configuration helpers

pub mod abi;
pub mod address;
pub mod call;
pub mod env_utils;
pub mod module_id;
pub mod transaction;
pub mod type_parsing;

pub use abi::{
    GenericTypeParam, ModuleDefinition, MoveFunctionAbi, MoveModuleAbi, MoveStructAbi,
    MoveStructField, Visibility,
};
pub use call::{ArgumentOperation, CallArgument, FunctionArgument, PreviousResult};
pub use module_id::{FunctionId, ModuleIdentifier};
pub use transaction::{
    ChainId, RawTransaction, ScriptArgument, ScriptPayload, SimpleTransaction, TransactionPayload,
};
pub use type_parsing::{
    format_type_tag, parse_type_tag, parse_type_tag_with_depth, MoveType, TypeNestingError,
    DEFAULT_MAX_PARSE_DEPTH,
};
