//! Module fixtures.
//!
//! ABIs are written out by hand; the matching bytecode is synthesized from the
//! ABI so the engine sees the same callable surface the validator does.

use std::collections::BTreeMap;
use std::sync::Arc;

use composer_core::bytecode::{synthesize_module, ModuleShape};
use composer_core::{ComposerContext, EngineFactory, MockFetcher, ModuleCache};
use composer_types::{
    GenericTypeParam, ModuleDefinition, ModuleIdentifier, MoveFunctionAbi, MoveModuleAbi,
    Visibility,
};
use move_core_types::account_address::AccountAddress;

pub const APT: &str = "0x1::aptos_coin::AptosCoin";

pub fn function(name: &str, type_params: usize, params: &[&str], returns: &[&str]) -> MoveFunctionAbi {
    MoveFunctionAbi {
        name: name.to_string(),
        visibility: Visibility::Public,
        is_entry: false,
        is_view: false,
        generic_type_params: vec![GenericTypeParam::default(); type_params],
        params: params.iter().map(|p| p.to_string()).collect(),
        returns: returns.iter().map(|r| r.to_string()).collect(),
    }
}

/// `0x1::coin` with the usual withdraw / deposit / value trio.
pub fn coin_abi() -> MoveModuleAbi {
    MoveModuleAbi {
        address: "0x1".to_string(),
        name: "coin".to_string(),
        friends: vec![],
        exposed_functions: vec![
            function("withdraw", 1, &["&signer", "u64"], &["0x1::coin::Coin<T0>"]),
            function("deposit", 1, &["address", "0x1::coin::Coin<T0>"], &[]),
            function("value", 1, &["&0x1::coin::Coin<T0>"], &["u64"]),
            function("split", 1, &["&mut 0x1::coin::Coin<T0>", "u64"], &["0x1::coin::Coin<T0>"]),
        ],
        structs: vec![],
    }
}

/// `0xcafe::router` whose `swap<T>` takes any struct value as opaque bytes.
pub fn router_abi() -> MoveModuleAbi {
    MoveModuleAbi {
        address: "0xcafe".to_string(),
        name: "router".to_string(),
        friends: vec![],
        exposed_functions: vec![
            function("swap", 1, &["&signer", "u64"], &["u64", "u64"]),
            function("settle", 0, &["0xcafe::router::Receipt"], &[]),
        ],
        structs: vec![],
    }
}

/// Module with bytecode matching `abi`, ABI attached.
pub fn module_with_abi(abi: MoveModuleAbi) -> ModuleDefinition {
    let shape = ModuleShape::from_abi(&abi).expect("fixture ABI is valid");
    ModuleDefinition::new(synthesize_module(&shape).expect("fixture module compiles")).with_abi(abi)
}

/// Bytecode-only module without functions.
pub fn plain_module(id: &str) -> ModuleDefinition {
    let shape = ModuleShape {
        id: module_id(id),
        functions: BTreeMap::new(),
    };
    ModuleDefinition::new(synthesize_module(&shape).expect("fixture module compiles"))
}

pub fn module_id(id: &str) -> ModuleIdentifier {
    id.parse().expect("fixture module id is valid")
}

/// Fetcher serving `0x1::coin`, `0x1::aptos_coin`, `0xcafe::router` and the
/// nested-type modules `0xa::m1`, `0xb::m2`, `0xc::m3`.
pub fn populated_fetcher() -> Arc<MockFetcher> {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.add_module(module_id("0x1::coin"), module_with_abi(coin_abi()));
    fetcher.add_module(module_id("0xcafe::router"), module_with_abi(router_abi()));
    for id in ["0x1::aptos_coin", "0xa::m1", "0xb::m2", "0xc::m3"] {
        fetcher.add_module(module_id(id), plain_module(id));
    }
    fetcher
}

/// Context over `fetcher` with a fresh cache and the given engine factory.
pub fn context(fetcher: Arc<MockFetcher>, engine: EngineFactory) -> ComposerContext {
    ComposerContext::new(Arc::new(ModuleCache::new()), fetcher.clone(), fetcher).with_engine_factory(engine)
}

/// Module binary in the layout of a newer bytecode version than the local
/// deserializer accepts: version 8, a dependency handle ahead of the self
/// handle, function handles carrying access specifiers and a metadata table.
/// Only the module handle, address and identifier tables are meaningful.
pub fn newer_version_module(id: &str) -> Vec<u8> {
    let id = module_id(id);
    let mut identifiers = Vec::new();
    for name in ["signer", id.name()] {
        write_uleb(&mut identifiers, name.len());
        identifiers.extend_from_slice(name.as_bytes());
    }
    let mut addresses = AccountAddress::ONE.to_vec();
    addresses.extend_from_slice(id.address().as_ref());

    let tables: Vec<(u8, Vec<u8>)> = vec![
        // 0x1::signer, then self
        (0x01, vec![0, 0, 1, 1]),
        (0x03, vec![0, 0, 0, 0, 0, 0x01, 0x02, 0x00]),
        (0x07, identifiers),
        (0x08, addresses),
        (0x13, vec![0x01, 0x00, 0x00]),
    ];

    let mut bytes = vec![0xA1, 0x1C, 0xEB, 0x0B];
    bytes.extend_from_slice(&8u32.to_le_bytes());
    write_uleb(&mut bytes, tables.len());
    let mut offset = 0;
    for (kind, content) in &tables {
        bytes.push(*kind);
        write_uleb(&mut bytes, offset);
        write_uleb(&mut bytes, content.len());
        offset += content.len();
    }
    for (_, content) in &tables {
        bytes.extend_from_slice(content);
    }
    write_uleb(&mut bytes, 1);
    bytes
}

fn write_uleb(out: &mut Vec<u8>, mut value: usize) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}
