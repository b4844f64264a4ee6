//! Network collaborators of a composer session.
//!
//! Two traits abstract everything a session needs from the outside world:
//!
//! - [`ModuleFetcher`]: module bytecode + ABI lookup
//! - [`TransactionGenerator`]: turning a script payload into a raw transaction
//!
//! Both are implemented for [`FullnodeClient`] (live node), [`NoopFetcher`]
//! (offline, every call fails) and [`MockFetcher`] (pre-loaded modules for
//! tests).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{anyhow, Result};
use composer_transport::FullnodeClient;
use composer_types::{
    ChainId, ModuleDefinition, ModuleIdentifier, MoveModuleAbi, RawTransaction, TransactionPayload,
};
use move_core_types::account_address::AccountAddress;
use parking_lot::Mutex;
use tracing::debug;

use crate::assembler::TransactionOptions;

/// Async source of module definitions.
#[async_trait::async_trait]
pub trait ModuleFetcher: Send + Sync {
    /// Fetch bytecode and ABI of `address::name`.
    /// Returns `Ok(None)` if the module does not exist.
    async fn fetch_module(
        &self,
        address: &AccountAddress,
        name: &str,
        ledger_version: Option<u64>,
    ) -> Result<Option<ModuleDefinition>>;

    /// Fetch only the ABI of `address::name` at `ledger_version`.
    async fn fetch_module_abi(
        &self,
        address: &AccountAddress,
        name: &str,
        ledger_version: Option<u64>,
    ) -> Result<Option<MoveModuleAbi>> {
        Ok(self
            .fetch_module(address, name, ledger_version)
            .await?
            .and_then(|module| module.abi))
    }
}

/// Async builder of unsigned transactions.
#[async_trait::async_trait]
pub trait TransactionGenerator: Send + Sync {
    async fn generate_raw_transaction(
        &self,
        sender: AccountAddress,
        payload: TransactionPayload,
        options: &TransactionOptions,
    ) -> Result<RawTransaction>;
}

#[async_trait::async_trait]
impl ModuleFetcher for FullnodeClient {
    async fn fetch_module(
        &self,
        address: &AccountAddress,
        name: &str,
        ledger_version: Option<u64>,
    ) -> Result<Option<ModuleDefinition>> {
        let client = self.clone();
        let address = *address;
        let name = name.to_string();
        tokio::task::spawn_blocking(move || client.get_module(&address, &name, ledger_version))
            .await
            .map_err(|e| anyhow!("Module fetch task failed: {}", e))?
    }
}

#[async_trait::async_trait]
impl TransactionGenerator for FullnodeClient {
    async fn generate_raw_transaction(
        &self,
        sender: AccountAddress,
        payload: TransactionPayload,
        options: &TransactionOptions,
    ) -> Result<RawTransaction> {
        let client = self.clone();
        let options = options.clone();
        tokio::task::spawn_blocking(move || {
            let sequence_number = match options.account_sequence_number {
                Some(n) => n,
                None => client.get_account(&sender)?.sequence_number,
            };
            let gas_unit_price = match options.gas_unit_price {
                Some(price) => price,
                None => client.estimate_gas_price()?.gas_estimate,
            };
            let ledger = client.get_ledger_info()?;
            debug!(
                sender = %sender.to_hex_literal(),
                sequence_number,
                gas_unit_price,
                chain_id = ledger.chain_id,
                "generated raw transaction"
            );
            Ok(RawTransaction {
                sender,
                sequence_number,
                payload,
                max_gas_amount: options.max_gas_amount,
                gas_unit_price,
                expiration_timestamp_secs: options.expiration_timestamp_secs(),
                chain_id: ChainId::new(ledger.chain_id),
            })
        })
        .await
        .map_err(|e| anyhow!("Transaction generation task failed: {}", e))?
    }
}

/// Collaborator used when network access is disabled. Every call fails.
pub struct NoopFetcher;

const FETCH_DISABLED: &str =
    "Network access is disabled. Configure the composer context with a fullnode client.";

#[async_trait::async_trait]
impl ModuleFetcher for NoopFetcher {
    async fn fetch_module(
        &self,
        _address: &AccountAddress,
        _name: &str,
        _ledger_version: Option<u64>,
    ) -> Result<Option<ModuleDefinition>> {
        Err(anyhow!(FETCH_DISABLED))
    }
}

#[async_trait::async_trait]
impl TransactionGenerator for NoopFetcher {
    async fn generate_raw_transaction(
        &self,
        _sender: AccountAddress,
        _payload: TransactionPayload,
        _options: &TransactionOptions,
    ) -> Result<RawTransaction> {
        Err(anyhow!(FETCH_DISABLED))
    }
}

/// In-memory collaborator for tests that counts every request.
///
/// # Example
/// ```
/// use composer_core::fetcher::{MockFetcher, ModuleFetcher};
/// use composer_types::ModuleDefinition;
///
/// let fetcher = MockFetcher::new();
/// fetcher.add_module("0x1::coin".parse().unwrap(), ModuleDefinition::new(vec![1, 2, 3]));
/// assert_eq!(fetcher.module_fetch_count(), 0);
/// ```
#[derive(Default)]
pub struct MockFetcher {
    modules: Mutex<HashMap<ModuleIdentifier, ModuleDefinition>>,
    fetches: Mutex<HashMap<ModuleIdentifier, usize>>,
    abi_fetches: AtomicUsize,
    ledger_versions: Mutex<Vec<Option<u64>>>,
    generated: AtomicUsize,
    chain_id: Option<ChainId>,
    force_error: Mutex<Option<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            chain_id: Some(ChainId::LOCAL),
            ..Self::default()
        }
    }

    pub fn add_module(&self, id: ModuleIdentifier, definition: ModuleDefinition) -> &Self {
        self.modules.lock().insert(id, definition);
        self
    }

    /// Make every subsequent request fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.force_error.lock() = Some(message.to_string());
    }

    /// Number of `fetch_module` calls for `id`.
    pub fn fetch_count(&self, id: &ModuleIdentifier) -> usize {
        self.fetches.lock().get(id).copied().unwrap_or(0)
    }

    /// Total `fetch_module` calls.
    pub fn module_fetch_count(&self) -> usize {
        self.fetches.lock().values().sum()
    }

    /// Ledger versions requested so far, module and ABI fetches alike.
    pub fn requested_ledger_versions(&self) -> Vec<Option<u64>> {
        self.ledger_versions.lock().clone()
    }

    pub fn abi_fetch_count(&self) -> usize {
        self.abi_fetches.load(Ordering::SeqCst)
    }

    pub fn generated_count(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    fn check_forced_error(&self) -> Result<()> {
        match self.force_error.lock().as_ref() {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ModuleFetcher for MockFetcher {
    async fn fetch_module(
        &self,
        address: &AccountAddress,
        name: &str,
        ledger_version: Option<u64>,
    ) -> Result<Option<ModuleDefinition>> {
        let id = ModuleIdentifier::from_parts(*address, name)?;
        self.ledger_versions.lock().push(ledger_version);
        *self.fetches.lock().entry(id.clone()).or_insert(0) += 1;
        self.check_forced_error()?;
        Ok(self.modules.lock().get(&id).cloned())
    }

    async fn fetch_module_abi(
        &self,
        address: &AccountAddress,
        name: &str,
        ledger_version: Option<u64>,
    ) -> Result<Option<MoveModuleAbi>> {
        self.abi_fetches.fetch_add(1, Ordering::SeqCst);
        self.ledger_versions.lock().push(ledger_version);
        self.check_forced_error()?;
        let id = ModuleIdentifier::from_parts(*address, name)?;
        Ok(self.modules.lock().get(&id).and_then(|m| m.abi.clone()))
    }
}

#[async_trait::async_trait]
impl TransactionGenerator for MockFetcher {
    async fn generate_raw_transaction(
        &self,
        sender: AccountAddress,
        payload: TransactionPayload,
        options: &TransactionOptions,
    ) -> Result<RawTransaction> {
        self.generated.fetch_add(1, Ordering::SeqCst);
        self.check_forced_error()?;
        Ok(RawTransaction {
            sender,
            sequence_number: options.account_sequence_number.unwrap_or(0),
            payload,
            max_gas_amount: options.max_gas_amount,
            gas_unit_price: options.gas_unit_price.unwrap_or(100),
            expiration_timestamp_secs: options.expiration_timestamp_secs(),
            chain_id: self.chain_id.unwrap_or(ChainId::LOCAL),
        })
    }
}
