//! Module ABI and bytecode as served by a fullnode.
//!
//! These mirror the node's `MoveModuleBytecode` JSON so a fetched module can be
//! deserialized directly:
//!
//! ```json
//! {
//!   "bytecode": "0xa11ceb0b...",
//!   "abi": {
//!     "address": "0x1",
//!     "name": "coin",
//!     "friends": ["0x1::aptos_coin"],
//!     "exposed_functions": [{
//!       "name": "withdraw",
//!       "visibility": "public",
//!       "is_entry": false,
//!       "is_view": false,
//!       "generic_type_params": [{ "constraints": [] }],
//!       "params": ["&signer", "u64"],
//!       "return": ["0x1::coin::Coin<T0>"]
//!     }],
//!     "structs": []
//!   }
//! }
//! ```
//!
//! A [`ModuleDefinition`] is immutable once fetched and is shared between
//! sessions behind an `Arc`.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::module_id::ModuleIdentifier;

/// Module bytecode plus its (optional) ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// Compiled module bytes (hex string with 0x prefix on the wire).
    #[serde(with = "hex_bytes")]
    pub bytecode: Vec<u8>,

    /// Public interface. Absent when the node was asked for bytecode only.
    #[serde(default)]
    pub abi: Option<MoveModuleAbi>,
}

impl ModuleDefinition {
    pub fn new(bytecode: Vec<u8>) -> Self {
        Self {
            bytecode,
            abi: None,
        }
    }

    /// Builder: attach an ABI.
    pub fn with_abi(mut self, abi: MoveModuleAbi) -> Self {
        self.abi = Some(abi);
        self
    }

    /// The identifier described by the attached ABI, if any.
    pub fn module_id(&self) -> Option<Result<ModuleIdentifier>> {
        self.abi.as_ref().map(ModuleIdentifier::from_abi)
    }
}

/// Public interface description of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveModuleAbi {
    pub address: String,
    pub name: String,
    #[serde(default)]
    pub friends: Vec<String>,
    #[serde(default)]
    pub exposed_functions: Vec<MoveFunctionAbi>,
    #[serde(default)]
    pub structs: Vec<MoveStructAbi>,
}

impl MoveModuleAbi {
    /// Find an exposed function by name.
    pub fn function(&self, name: &str) -> Option<&MoveFunctionAbi> {
        self.exposed_functions.iter().find(|f| f.name == name)
    }

    /// Find a struct declared by this module.
    pub fn struct_def(&self, name: &str) -> Option<&MoveStructAbi> {
        self.structs.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Private,
    Public,
    Friend,
}

/// Generic type parameter with its ability constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericTypeParam {
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// An exposed function of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveFunctionAbi {
    pub name: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_entry: bool,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default)]
    pub generic_type_params: Vec<GenericTypeParam>,
    /// Parameter types as Move type strings (`&signer`, `u64`, `T0`, ...).
    #[serde(default)]
    pub params: Vec<String>,
    /// Return types as Move type strings.
    #[serde(rename = "return", default)]
    pub returns: Vec<String>,
}

impl MoveFunctionAbi {
    /// Number of declared generic type parameters.
    pub fn type_param_count(&self) -> usize {
        self.generic_type_params.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStructField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveStructAbi {
    pub name: String,
    #[serde(default)]
    pub is_native: bool,
    #[serde(default)]
    pub is_event: bool,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub generic_type_params: Vec<GenericTypeParam>,
    #[serde(default)]
    pub fields: Vec<MoveStructField>,
}

/// Serde helper for `Vec<u8>` carried as a 0x-prefixed hex string.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::address::{parse_hex_bytes, to_hex_prefixed};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_hex_prefixed(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_hex_bytes(&s, "module bytecode").map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COIN_MODULE_JSON: &str = r#"{
        "bytecode": "0xa11ceb0b0600",
        "abi": {
            "address": "0x1",
            "name": "coin",
            "friends": ["0x1::aptos_coin"],
            "exposed_functions": [{
                "name": "withdraw",
                "visibility": "public",
                "is_entry": false,
                "is_view": false,
                "generic_type_params": [{ "constraints": [] }],
                "params": ["&signer", "u64"],
                "return": ["0x1::coin::Coin<T0>"]
            }],
            "structs": [{
                "name": "Coin",
                "is_native": false,
                "abilities": ["store"],
                "generic_type_params": [{ "constraints": [] }],
                "fields": [{ "name": "value", "type": "u64" }]
            }]
        }
    }"#;

    #[test]
    fn test_deserialize_node_module() {
        let def: ModuleDefinition = serde_json::from_str(COIN_MODULE_JSON).unwrap();
        assert_eq!(def.bytecode, vec![0xa1, 0x1c, 0xeb, 0x0b, 0x06, 0x00]);

        let abi = def.abi.as_ref().unwrap();
        let withdraw = abi.function("withdraw").unwrap();
        assert_eq!(withdraw.visibility, Visibility::Public);
        assert_eq!(withdraw.type_param_count(), 1);
        assert_eq!(withdraw.params, vec!["&signer", "u64"]);
        assert_eq!(withdraw.returns, vec!["0x1::coin::Coin<T0>"]);
        assert!(abi.function("deposit").is_none());

        let coin = abi.struct_def("Coin").unwrap();
        assert_eq!(coin.fields[0].type_, "u64");
        assert!(!coin.is_event);

        let id = def.module_id().unwrap().unwrap();
        assert_eq!(id.to_string(), "0x1::coin");
    }

    #[test]
    fn test_bytecode_only_module() {
        let def: ModuleDefinition = serde_json::from_str(r#"{ "bytecode": "0x0102" }"#).unwrap();
        assert!(def.abi.is_none());
        assert!(def.module_id().is_none());
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["bytecode"], "0x0102");
    }

    #[test]
    fn test_bad_bytecode_hex_rejected() {
        let result: std::result::Result<ModuleDefinition, serde_json::Error> =
            serde_json::from_str(r#"{ "bytecode": "0xzz" }"#);
        assert!(result.is_err());
    }
}
