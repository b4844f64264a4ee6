use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use composer_types::env_utils::env_string;
use composer_types::ChainId;

const MAINNET_FULLNODE: &str = "https://api.mainnet.aptoslabs.com/v1";
const TESTNET_FULLNODE: &str = "https://api.testnet.aptoslabs.com/v1";
const DEVNET_FULLNODE: &str = "https://api.devnet.aptoslabs.com/v1";
const LOCAL_FULLNODE: &str = "http://127.0.0.1:8080/v1";

/// Environment variable overriding the fullnode endpoint.
pub const NODE_URL_ENV: &str = "COMPOSER_NODE_URL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Devnet,
    Local,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
            Network::Local => "local",
        }
    }

    pub fn default_fullnode_endpoint(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_FULLNODE,
            Network::Testnet => TESTNET_FULLNODE,
            Network::Devnet => DEVNET_FULLNODE,
            Network::Local => LOCAL_FULLNODE,
        }
    }

    /// Well-known chain id. Devnet is reset periodically and has none.
    pub fn known_chain_id(&self) -> Option<ChainId> {
        match self {
            Network::Mainnet => Some(ChainId::MAINNET),
            Network::Testnet => Some(ChainId::TESTNET),
            Network::Devnet => None,
            Network::Local => Some(ChainId::LOCAL),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            "local" | "localnet" => Ok(Network::Local),
            other => Err(anyhow!("Unknown network '{}'", other)),
        }
    }
}

pub fn infer_network_from_url(url: &str) -> Option<Network> {
    let lower = url.to_lowercase();
    if lower.contains("testnet") {
        Some(Network::Testnet)
    } else if lower.contains("devnet") {
        Some(Network::Devnet)
    } else if lower.contains("mainnet") {
        Some(Network::Mainnet)
    } else if lower.contains("127.0.0.1") || lower.contains("localhost") {
        Some(Network::Local)
    } else {
        None
    }
}

/// Fullnode endpoint for `network`, unless `COMPOSER_NODE_URL` is set.
pub fn resolve_fullnode_endpoint(network: Network) -> String {
    match env_string(NODE_URL_ENV) {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => network.default_fullnode_endpoint().to_string(),
    }
}
