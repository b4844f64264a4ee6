//! Shared configuration of composer sessions.
//!
//! A [`ComposerContext`] is created once and cloned into every session. All
//! clones share the same [`ModuleCache`], so a module fetched by one session is
//! never fetched again by another.
//!
//! Contexts built with [`ComposerContext::new`] or [`ComposerContext::offline`]
//! default to [`CallPlanEngine`], whose output is a call plan and not
//! executable script bytecode. Contexts talking to a fullnode take their engine
//! factory explicitly.

use std::sync::Arc;

use anyhow::Result;
use composer_transport::{FullnodeClient, Network};
use composer_types::env_utils::{env_var, env_var_or};

use crate::cache::ModuleCache;
use crate::engine::{CallPlanEngine, ComposerEngine};
use crate::fetcher::{ModuleFetcher, NoopFetcher, TransactionGenerator};

pub const MAX_TYPE_DEPTH_ENV: &str = "COMPOSER_MAX_TYPE_DEPTH";
pub const LEDGER_VERSION_ENV: &str = "COMPOSER_LEDGER_VERSION";

/// Struct and vector nesting accepted in a type argument.
pub const DEFAULT_MAX_TYPE_DEPTH: usize = 16;

/// Builds a fresh engine for each session.
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn ComposerEngine> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerSettings {
    /// Ledger version modules are fetched at. `None` means latest.
    pub ledger_version: Option<u64>,
    pub max_type_depth: usize,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            ledger_version: None,
            max_type_depth: DEFAULT_MAX_TYPE_DEPTH,
        }
    }
}

impl ComposerSettings {
    /// Defaults overridden by `COMPOSER_MAX_TYPE_DEPTH` and
    /// `COMPOSER_LEDGER_VERSION`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ledger_version: env_var(LEDGER_VERSION_ENV)?,
            max_type_depth: env_var_or(MAX_TYPE_DEPTH_ENV, DEFAULT_MAX_TYPE_DEPTH)?,
        })
    }

    pub fn with_max_type_depth(mut self, max_type_depth: usize) -> Self {
        self.max_type_depth = max_type_depth;
        self
    }

    pub fn with_ledger_version(mut self, ledger_version: u64) -> Self {
        self.ledger_version = Some(ledger_version);
        self
    }
}

/// Collaborators and settings shared by sessions.
#[derive(Clone)]
pub struct ComposerContext {
    pub cache: Arc<ModuleCache>,
    pub fetcher: Arc<dyn ModuleFetcher>,
    pub generator: Arc<dyn TransactionGenerator>,
    pub engine_factory: EngineFactory,
    pub settings: ComposerSettings,
}

impl ComposerContext {
    pub fn new(
        cache: Arc<ModuleCache>,
        fetcher: Arc<dyn ModuleFetcher>,
        generator: Arc<dyn TransactionGenerator>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            generator,
            engine_factory: Arc::new(|| {
                Box::new(CallPlanEngine::single_signer()) as Box<dyn ComposerEngine>
            }),
            settings: ComposerSettings::default(),
        }
    }

    /// Context without network access. Every module must be supplied or cached.
    pub fn offline(cache: Arc<ModuleCache>) -> Self {
        let noop = Arc::new(NoopFetcher);
        Self::new(cache, noop.clone(), noop)
    }

    pub fn for_fullnode(
        client: FullnodeClient,
        cache: Arc<ModuleCache>,
        engine_factory: EngineFactory,
    ) -> Self {
        let client = Arc::new(client);
        Self::new(cache, client.clone(), client).with_engine_factory(engine_factory)
    }

    /// Fullnode context for `network` with settings from the environment.
    pub fn from_env(network: Network, engine_factory: EngineFactory) -> Result<Self> {
        let client = FullnodeClient::for_network(network)?;
        Ok(Self::for_fullnode(client, Arc::new(ModuleCache::new()), engine_factory)
            .with_settings(ComposerSettings::from_env()?))
    }

    pub fn with_engine_factory(mut self, factory: EngineFactory) -> Self {
        self.engine_factory = factory;
        self
    }

    pub fn with_settings(mut self, settings: ComposerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn new_engine(&self) -> Box<dyn ComposerEngine> {
        (self.engine_factory)()
    }
}

impl std::fmt::Debug for ComposerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposerContext")
            .field("cached_modules", &self.cache.len())
            .field("settings", &self.settings)
            .finish()
    }
}
