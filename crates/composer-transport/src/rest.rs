//! REST client for an Aptos-style fullnode.
//!
//! Only the handful of endpoints needed to compose and assemble a script
//! transaction are covered:
//!
//! - `GET /accounts/{address}/module/{name}` - module bytecode + ABI
//! - `GET /accounts/{address}` - sequence number
//! - `GET /` - ledger info (chain id, ledger timestamp)
//! - `GET /estimate_gas_price`
//!
//! ## Usage
//!
//! ```ignore
//! let client = FullnodeClient::mainnet()?;
//! let coin = client.get_module(&AccountAddress::ONE, "coin", None)?;
//! ```
//!
//! Calls are blocking; async callers should wrap them in
//! `tokio::task::spawn_blocking`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use composer_types::env_utils::env_var_or;
use composer_types::ModuleDefinition;
use move_core_types::account_address::AccountAddress;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::network::{resolve_fullnode_endpoint, Network};

pub const TIMEOUT_ENV: &str = "COMPOSER_HTTP_TIMEOUT_SECS";
pub const CONNECT_TIMEOUT_ENV: &str = "COMPOSER_HTTP_CONNECT_TIMEOUT_SECS";

/// Fullnode REST client.
#[derive(Clone)]
pub struct FullnodeClient {
    endpoint: String,
    agent: ureq::Agent,
}

/// Account resource summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(deserialize_with = "u64_from_string")]
    pub sequence_number: u64,
    pub authentication_key: String,
}

/// Ledger info returned by the index endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInfo {
    pub chain_id: u8,
    #[serde(deserialize_with = "u64_from_string")]
    pub ledger_version: u64,
    /// Microseconds since the epoch.
    #[serde(deserialize_with = "u64_from_string")]
    pub ledger_timestamp: u64,
}

impl LedgerInfo {
    pub fn ledger_timestamp_secs(&self) -> u64 {
        self.ledger_timestamp / 1_000_000
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasEstimation {
    pub gas_estimate: u64,
    #[serde(default)]
    pub deprioritized_gas_estimate: Option<u64>,
    #[serde(default)]
    pub prioritized_gas_estimate: Option<u64>,
}

/// Error body returned by the node on non-2xx responses.
#[derive(Debug, Deserialize)]
struct NodeError {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

impl FullnodeClient {
    /// Default request timeout in seconds (can be overridden by env).
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default connect timeout in seconds (can be overridden by env).
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    fn default_timeouts() -> Result<(Duration, Duration)> {
        let timeout_secs = env_var_or(TIMEOUT_ENV, Self::DEFAULT_TIMEOUT_SECS)?;
        let connect_secs = env_var_or(CONNECT_TIMEOUT_ENV, Self::DEFAULT_CONNECT_TIMEOUT_SECS)?;
        Ok((
            Duration::from_secs(timeout_secs),
            Duration::from_secs(connect_secs),
        ))
    }

    fn build_agent(timeout: Duration, connect_timeout: Duration) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(timeout)
            .timeout_connect(connect_timeout)
            .build()
    }

    pub fn mainnet() -> Result<Self> {
        Self::new(Network::Mainnet.default_fullnode_endpoint())
    }

    pub fn testnet() -> Result<Self> {
        Self::new(Network::Testnet.default_fullnode_endpoint())
    }

    /// Client for `network`, honoring `COMPOSER_NODE_URL`.
    pub fn for_network(network: Network) -> Result<Self> {
        Self::new(&resolve_fullnode_endpoint(network))
    }

    /// Create a client with a custom endpoint (e.g. `http://127.0.0.1:8080/v1`).
    pub fn new(endpoint: &str) -> Result<Self> {
        let (timeout, connect_timeout) = Self::default_timeouts()?;
        Ok(Self::with_timeouts(endpoint, timeout, connect_timeout))
    }

    /// Create a client with explicit timeouts.
    pub fn with_timeouts(endpoint: &str, timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            agent: Self::build_agent(timeout, connect_timeout),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn module_url(&self, address: &AccountAddress, name: &str) -> String {
        format!(
            "{}/accounts/{}/module/{}",
            self.endpoint,
            address.to_hex_literal(),
            name
        )
    }

    fn account_url(&self, address: &AccountAddress) -> String {
        format!("{}/accounts/{}", self.endpoint, address.to_hex_literal())
    }

    /// Execute a GET request. `Ok(None)` on 404.
    fn get<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<Option<T>> {
        trace!(url, "fullnode GET");
        let mut request = self.agent.get(url).set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => return Ok(None),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(anyhow!(
                    "Fullnode request {} failed with status {}: {}",
                    url,
                    code,
                    describe_error_body(&body)
                ));
            }
            Err(e) => return Err(anyhow!("Fullnode request {} failed: {}", url, e)),
        };

        let value: Value = response
            .into_json()
            .map_err(|e| anyhow!("Failed to read fullnode response from {}: {}", url, e))?;
        serde_json::from_value(value)
            .map(Some)
            .with_context(|| format!("Unexpected fullnode response shape from {}", url))
    }

    /// Fetch a module's bytecode and ABI.
    ///
    /// Returns `Ok(None)` when the account or module does not exist.
    pub fn get_module(
        &self,
        address: &AccountAddress,
        name: &str,
        ledger_version: Option<u64>,
    ) -> Result<Option<ModuleDefinition>> {
        let url = self.module_url(address, name);
        let query: Vec<(&str, String)> = ledger_version
            .map(|v| vec![("ledger_version", v.to_string())])
            .unwrap_or_default();
        let module: Option<ModuleDefinition> = self.get(&url, &query)?;
        debug!(
            address = %address.to_hex_literal(),
            module = name,
            found = module.is_some(),
            "fetched module"
        );
        Ok(module)
    }

    pub fn get_account(&self, address: &AccountAddress) -> Result<AccountInfo> {
        let url = self.account_url(address);
        self.get(&url, &[])?
            .ok_or_else(|| anyhow!("Account {} not found", address.to_hex_literal()))
    }

    pub fn get_ledger_info(&self) -> Result<LedgerInfo> {
        let url = format!("{}/", self.endpoint);
        self.get(&url, &[])?
            .ok_or_else(|| anyhow!("Ledger info not available at {}", self.endpoint))
    }

    pub fn estimate_gas_price(&self) -> Result<GasEstimation> {
        let url = format!("{}/estimate_gas_price", self.endpoint);
        self.get(&url, &[])?
            .ok_or_else(|| anyhow!("Gas estimation not available at {}", self.endpoint))
    }
}

fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<NodeError>(body) {
        Ok(NodeError {
            message,
            error_code: Some(code),
        }) => format!("{} ({})", message, code),
        Ok(NodeError { message, .. }) => message,
        Err(_) => body.to_string(),
    }
}

/// The node renders u64 values as JSON strings.
fn u64_from_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}
