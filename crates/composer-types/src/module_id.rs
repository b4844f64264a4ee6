//! Module and function identifiers.
//!
//! A [`ModuleIdentifier`] is the `(address, module name)` pair used as the key
//! of the module cache and of each session's pushed-module set. Two
//! identifiers are equal iff their canonical strings (`address::name`, address
//! in AIP-40 form) are equal; the derived equality on the parsed fields gives
//! exactly that.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use move_core_types::account_address::AccountAddress;
use move_core_types::identifier::Identifier;
use move_core_types::language_storage::{ModuleId, StructTag};

use crate::abi::MoveModuleAbi;
use crate::address::{format_address, parse_address};

/// `(address, module name)` pair identifying an on-chain module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleIdentifier {
    address: AccountAddress,
    name: Identifier,
}

impl ModuleIdentifier {
    pub fn new(address: AccountAddress, name: Identifier) -> Self {
        Self { address, name }
    }

    /// Build an identifier from an address and an unchecked module name.
    pub fn from_parts(address: AccountAddress, name: &str) -> Result<Self> {
        let name = Identifier::new(name).map_err(|e| anyhow!("Invalid module name '{}': {}", name, e))?;
        Ok(Self { address, name })
    }

    /// Derive the identifier a module ABI describes.
    pub fn from_abi(abi: &MoveModuleAbi) -> Result<Self> {
        let address = parse_address(&abi.address, "ABI module address")?;
        Self::from_parts(address, &abi.name)
    }

    /// The module that declares a struct type.
    pub fn from_struct_tag(tag: &StructTag) -> Self {
        Self {
            address: tag.address,
            name: tag.module.clone(),
        }
    }

    pub fn address(&self) -> &AccountAddress {
        &self.address
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn to_module_id(&self) -> ModuleId {
        ModuleId::new(self.address, self.name.clone())
    }
}

impl From<&ModuleId> for ModuleIdentifier {
    fn from(id: &ModuleId) -> Self {
        Self {
            address: *id.address(),
            name: id.name().to_owned(),
        }
    }
}

impl fmt::Display for ModuleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", format_address(&self.address), self.name)
    }
}

impl FromStr for ModuleIdentifier {
    type Err = anyhow::Error;

    /// Parse `"0x1::coin"`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split("::").collect();
        if parts.len() != 2 {
            return Err(anyhow!(
                "Invalid module identifier '{}': expected 'address::module'",
                s
            ));
        }
        let address = parse_address(parts[0], "module address")?;
        Self::from_parts(address, parts[1])
    }
}

/// Fully-qualified Move function (`address::module::function`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionId {
    pub module: ModuleIdentifier,
    pub function: Identifier,
}

impl FunctionId {
    pub fn function_name(&self) -> &str {
        self.function.as_str()
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.function)
    }
}

impl FromStr for FunctionId {
    type Err = anyhow::Error;

    /// Parse `"0x1::coin::withdraw"`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split("::").collect();
        if parts.len() != 3 {
            return Err(anyhow!(
                "Invalid function id '{}': expected 'address::module::function'",
                s
            ));
        }
        let address = parse_address(parts[0], "function address")?;
        let module = ModuleIdentifier::from_parts(address, parts[1])?;
        let function = Identifier::new(parts[2])
            .map_err(|e| anyhow!("Invalid function name '{}': {}", parts[2], e))?;
        Ok(Self { module, function })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_identifier_canonical_equality() {
        let short: ModuleIdentifier = "0x1::coin".parse().unwrap();
        let full: ModuleIdentifier =
            "0x0000000000000000000000000000000000000000000000000000000000000001::coin"
                .parse()
                .unwrap();
        assert_eq!(short, full);
        assert_eq!(short.to_string(), "0x1::coin");
        assert_eq!(short.to_string(), full.to_string());

        let other: ModuleIdentifier = "0x1::aptos_coin".parse().unwrap();
        assert_ne!(short, other);
    }

    #[test]
    fn test_module_identifier_long_address_display() {
        let id: ModuleIdentifier = "0xcafe::pool".parse().unwrap();
        assert_eq!(
            id.to_string(),
            "0x000000000000000000000000000000000000000000000000000000000000cafe::pool"
        );
    }

    #[test]
    fn test_module_identifier_parse_errors() {
        assert!("0x1".parse::<ModuleIdentifier>().is_err());
        assert!("0x1::coin::withdraw".parse::<ModuleIdentifier>().is_err());
        assert!("0xzz::coin".parse::<ModuleIdentifier>().is_err());
        assert!("0x1::bad-name".parse::<ModuleIdentifier>().is_err());
    }

    #[test]
    fn test_module_identifier_from_struct_tag() {
        let tag = StructTag {
            address: AccountAddress::ONE,
            module: Identifier::new("aptos_coin").unwrap(),
            name: Identifier::new("AptosCoin").unwrap(),
            type_params: vec![],
        };
        let id = ModuleIdentifier::from_struct_tag(&tag);
        assert_eq!(id.to_string(), "0x1::aptos_coin");
        assert_eq!(ModuleIdentifier::from(&id.to_module_id()), id);
    }

    #[test]
    fn test_function_id_parse() {
        let id: FunctionId = "0x1::coin::withdraw".parse().unwrap();
        assert_eq!(id.module.to_string(), "0x1::coin");
        assert_eq!(id.function_name(), "withdraw");
        assert_eq!(id.to_string(), "0x1::coin::withdraw");

        assert!("0x1::coin".parse::<FunctionId>().is_err());
        assert!("coin::withdraw::x::y".parse::<FunctionId>().is_err());
    }
}
