//! Composer Core
//!
//! Batches Move function calls into a single script transaction, resolving
//! and caching the modules each call depends on.
//!
//! # Core Modules
//!
//! - [`cache`]: process-wide [`ModuleCache`] shared by all sessions
//! - [`session`]: [`ComposerSession`], which registers modules and adds calls
//! - [`type_resolver`]: modules required by a type argument
//! - [`validator`] / [`arguments`]: call checks against the module ABI and
//!   argument encoding
//! - [`engine`]: the [`ComposerEngine`] seam and the bundled [`CallPlanEngine`]
//! - [`fetcher`]: network collaborators ([`ModuleFetcher`], [`TransactionGenerator`])
//! - [`assembler`]: [`assemble_transaction`], session to unsigned transaction
//!
//! # Example
//!
//! ```ignore
//! use composer_core::{BatchedCallRequest, ComposerContext, ComposerSession};
//! use composer_transport::Network;
//!
//! let context = ComposerContext::from_env(Network::Testnet, script_engine_factory())?;
//! let mut session = ComposerSession::new(context.clone());
//! let results = session
//!     .add_batched_calls(BatchedCallRequest::new("0x1::coin::withdraw")
//!         .type_argument("0x1::aptos_coin::AptosCoin")
//!         .argument(CallArgument::new_signer(0))
//!         .argument(json!(100)))
//!     .await?;
//! let payload = session.build_payload()?;
//! ```

#![allow(clippy::result_large_err)]

pub mod arguments;
pub mod assembler;
pub mod bytecode;
pub mod cache;
pub mod context;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod request;
pub mod session;
pub mod type_resolver;
pub mod validator;

pub use assembler::{assemble_transaction, TransactionOptions};
pub use cache::ModuleCache;
pub use context::{ComposerContext, ComposerSettings, EngineFactory};
pub use engine::{CallPlan, CallPlanEngine, ComposerEngine, PlannedCall};
pub use error::{ComposerError, ComposerResult};
pub use fetcher::{MockFetcher, ModuleFetcher, NoopFetcher, TransactionGenerator};
pub use request::BatchedCallRequest;
pub use session::ComposerSession;
pub use validator::validate_call;
