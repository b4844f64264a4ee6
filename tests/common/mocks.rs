//! Engine and fetcher doubles.
//!
//! [`RecordingEngine`] stands in for the composer engine and writes every
//! operation to a shared [`EngineLog`], so a test can inspect what a session
//! forwarded after the session has taken ownership of the engine.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use composer_core::bytecode::module_identifier;
use composer_core::{ComposerEngine, EngineFactory, MockFetcher, ModuleFetcher};
use composer_types::{CallArgument, ModuleDefinition, ModuleIdentifier, ScriptPayload};
use move_core_types::account_address::AccountAddress;
use parking_lot::Mutex;

/// One operation seen by a [`RecordingEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Store(ModuleIdentifier),
    Call {
        module: ModuleIdentifier,
        function: String,
        type_args: Vec<String>,
        args: Vec<CallArgument>,
    },
}

#[derive(Debug, Default)]
pub struct EngineLog {
    pub events: Vec<EngineEvent>,
}

impl EngineLog {
    pub fn stores(&self) -> Vec<ModuleIdentifier> {
        self.events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Store(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn store_count(&self, id: &ModuleIdentifier) -> usize {
        self.stores().iter().filter(|s| *s == id).count()
    }

    /// Position of the first call to `function`.
    pub fn call_position(&self, function: &str) -> Option<usize> {
        self.events.iter().position(|e| {
            matches!(e, EngineEvent::Call { function: f, .. } if f == function)
        })
    }

    /// Position of the registration of `id`.
    pub fn store_position(&self, id: &ModuleIdentifier) -> Option<usize> {
        self.events
            .iter()
            .position(|e| matches!(e, EngineEvent::Store(s) if s == id))
    }
}

/// Engine double returning `return_counts[function]` placeholders per call
/// (one when unset).
pub struct RecordingEngine {
    log: Arc<Mutex<EngineLog>>,
    return_counts: HashMap<String, u16>,
    calls: u16,
}

impl ComposerEngine for RecordingEngine {
    fn store_module(&mut self, bytecode: &[u8]) -> Result<()> {
        let id = module_identifier(bytecode)?;
        self.log.lock().events.push(EngineEvent::Store(id));
        Ok(())
    }

    fn add_batched_call(
        &mut self,
        module: &ModuleIdentifier,
        function: &str,
        type_args: &[String],
        args: Vec<CallArgument>,
    ) -> Result<Vec<CallArgument>> {
        self.log.lock().events.push(EngineEvent::Call {
            module: module.clone(),
            function: function.to_string(),
            type_args: type_args.to_vec(),
            args,
        });
        let call_idx = self.calls;
        self.calls += 1;
        let count = self.return_counts.get(function).copied().unwrap_or(1);
        Ok((0..count)
            .map(|i| CallArgument::previous_result(call_idx, i))
            .collect())
    }

    fn generate_bytecode(&mut self, _with_metadata: bool) -> Result<Vec<u8>> {
        ScriptPayload::new(vec![], vec![], vec![]).to_bcs()
    }
}

/// Factory producing recording engines that all write to one log.
pub fn recording_engine(return_counts: &[(&str, u16)]) -> (EngineFactory, Arc<Mutex<EngineLog>>) {
    let log = Arc::new(Mutex::new(EngineLog::default()));
    let counts: HashMap<String, u16> = return_counts
        .iter()
        .map(|(name, count)| (name.to_string(), *count))
        .collect();
    let shared = log.clone();
    let factory: EngineFactory = Arc::new(move || {
        Box::new(RecordingEngine {
            log: shared.clone(),
            return_counts: counts.clone(),
            calls: 0,
        }) as Box<dyn ComposerEngine>
    });
    (factory, log)
}

/// Fetcher that yields to the scheduler before every lookup, so concurrent
/// sessions interleave their fetches.
pub struct YieldingFetcher {
    pub inner: Arc<MockFetcher>,
}

#[async_trait::async_trait]
impl ModuleFetcher for YieldingFetcher {
    async fn fetch_module(
        &self,
        address: &AccountAddress,
        name: &str,
        ledger_version: Option<u64>,
    ) -> Result<Option<ModuleDefinition>> {
        tokio::task::yield_now().await;
        self.inner.fetch_module(address, name, ledger_version).await
    }
}
