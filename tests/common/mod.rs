#![allow(unused_imports)]
#![allow(dead_code)]
//! Shared test utilities for integration tests.
//!
//! # Modules
//!
//! - `fixtures`: module ABIs and synthesized bytecode, pre-loaded fetchers
//! - `mocks`: recording engine and fetcher doubles
//! - `assertions`: assertion helpers for composer errors

pub mod assertions;
pub mod fixtures;
pub mod mocks;

pub use assertions::{assert_arity_mismatch, assert_error_contains, assert_missing_module, assert_ok};
pub use fixtures::{
    coin_abi, context, module_id, module_with_abi, newer_version_module, plain_module,
    populated_fetcher, router_abi, APT,
};
pub use mocks::{recording_engine, EngineEvent, EngineLog, RecordingEngine, YieldingFetcher};
