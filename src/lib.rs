//! Move Script Composer
//!
//! Compose several Move function calls into one script transaction:
//!
//! - **Module resolution**: modules a call needs (its own module and every
//!   module named by its type arguments) are fetched from a fullnode or taken
//!   from caller-supplied bytecode
//! - **Caching**: fetched modules are kept in a process-wide cache shared by
//!   every session
//! - **Validation**: calls are checked against the module ABI and concrete
//!   arguments are BCS-encoded
//! - **Assembly**: the composed script becomes an unsigned raw transaction
//!
//! # Crates
//!
//! - [`types`]: shared data model (`composer-types`)
//! - [`transport`]: fullnode REST client (`composer-transport`)
//! - [`core`]: sessions, cache and engine (`composer-core`)

#![allow(clippy::result_large_err)]

pub use composer_core as core;
pub use composer_transport as transport;
pub use composer_types as types;

pub use composer_core::{
    assemble_transaction, BatchedCallRequest, CallPlan, CallPlanEngine, ComposerContext,
    ComposerEngine, ComposerError, ComposerResult, ComposerSession, ComposerSettings,
    ModuleCache, ModuleFetcher, TransactionGenerator, TransactionOptions,
};
pub use composer_transport::{FullnodeClient, Network};
pub use composer_types::{
    CallArgument, FunctionArgument, ModuleDefinition, ModuleIdentifier, MoveModuleAbi,
    SimpleTransaction, TransactionPayload,
};
