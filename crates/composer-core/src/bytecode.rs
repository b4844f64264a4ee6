//! Compiled module inspection.
//!
//! The engine only needs the callable surface of a module: function names,
//! generic arity, parameter count and return count. [`ModuleShape`] captures
//! that, built from a module ABI or, when no ABI is at hand, from compiled
//! bytecode.
//!
//! Module identity is read from the binary header and three tables only
//! (module handles, address identifiers, identifiers). Their layout is shared
//! by every bytecode version and flavor, unlike function handles and the
//! tables added in later versions.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use anyhow::{anyhow, bail, Context, Result};
use composer_types::{ModuleIdentifier, MoveModuleAbi};
use move_binary_format::file_format::{
    empty_module, AbilitySet, Bytecode, CodeUnit, CompiledModule, FunctionDefinition,
    FunctionHandle, FunctionHandleIndex, IdentifierIndex, ModuleHandleIndex, Signature,
    SignatureIndex, SignatureToken, Visibility,
};
use move_binary_format::file_format_common::{
    read_uleb128_as_u64, BinaryConstants, TableType, VERSION_5,
};
use move_core_types::account_address::AccountAddress;
use move_core_types::identifier::Identifier;

/// High byte of the version word carries a flavor tag on some chains.
const VERSION_NUMBER_MASK: u32 = 0x00FF_FFFF;

/// Callable surface of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionShape {
    pub name: String,
    pub is_public: bool,
    pub is_entry: bool,
    pub type_param_count: usize,
    pub param_count: usize,
    pub return_count: usize,
}

/// Callable surface of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleShape {
    pub id: ModuleIdentifier,
    pub functions: BTreeMap<String, FunctionShape>,
}

impl ModuleShape {
    pub fn from_compiled(module: &CompiledModule) -> Self {
        let mut functions = BTreeMap::new();
        for def in module.function_defs() {
            let handle = module.function_handle_at(def.function);
            let name = module.identifier_at(handle.name).to_string();
            functions.insert(
                name.clone(),
                FunctionShape {
                    name,
                    is_public: matches!(def.visibility, Visibility::Public),
                    is_entry: def.is_entry,
                    type_param_count: handle.type_parameters.len(),
                    param_count: module.signature_at(handle.parameters).0.len(),
                    return_count: module.signature_at(handle.return_).0.len(),
                },
            );
        }
        Self {
            id: ModuleIdentifier::from(&module.self_id()),
            functions,
        }
    }

    /// Shape of a module whose callable surface is unknown.
    pub fn opaque(id: ModuleIdentifier) -> Self {
        Self {
            id,
            functions: BTreeMap::new(),
        }
    }

    /// Build a shape from an ABI. Only exposed functions are known.
    pub fn from_abi(abi: &MoveModuleAbi) -> Result<Self> {
        let id = ModuleIdentifier::from_abi(abi)?;
        let functions = abi
            .exposed_functions
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    FunctionShape {
                        name: f.name.clone(),
                        is_public: f.visibility == composer_types::Visibility::Public,
                        is_entry: f.is_entry,
                        type_param_count: f.type_param_count(),
                        param_count: f.params.len(),
                        return_count: f.returns.len(),
                    },
                )
            })
            .collect();
        Ok(Self { id, functions })
    }

    pub fn function(&self, name: &str) -> Option<&FunctionShape> {
        self.functions.get(name)
    }
}

pub fn deserialize_module(bytes: &[u8]) -> Result<CompiledModule> {
    CompiledModule::deserialize_with_defaults(bytes)
        .map_err(|e| anyhow!("Failed to deserialize module bytecode: {}", e))
}

/// Identifier of the module contained in `bytes`.
///
/// Works for any bytecode version: only the self module handle and the
/// address and identifier entries it points at are decoded.
pub fn module_identifier(bytes: &[u8]) -> Result<ModuleIdentifier> {
    let header = BinaryHeader::read(bytes)?;
    let handles = header.table(bytes, TableType::MODULE_HANDLES as u8)?;
    let mut cursor = Cursor::new(handles);
    let mut self_handle = None;
    for idx in 0..=header.self_handle_idx {
        let address = read_index(&mut cursor).context("Truncated module handle table")?;
        let name = read_index(&mut cursor).context("Truncated module handle table")?;
        if idx == header.self_handle_idx {
            self_handle = Some((address, name));
        }
    }
    let (address_idx, name_idx) =
        self_handle.ok_or_else(|| anyhow!("Module has no self module handle"))?;

    let addresses = header.table(bytes, TableType::ADDRESS_IDENTIFIERS as u8)?;
    let start = address_idx * AccountAddress::LENGTH;
    let address = addresses
        .get(start..start + AccountAddress::LENGTH)
        .ok_or_else(|| anyhow!("Address index {} is out of bounds", address_idx))?;
    let address = AccountAddress::from_bytes(address)?;

    let identifiers = header.table(bytes, TableType::IDENTIFIERS as u8)?;
    let mut cursor = Cursor::new(identifiers);
    let mut name = String::new();
    for _ in 0..=name_idx {
        let len = read_index(&mut cursor).context("Truncated identifier table")?;
        let mut buf = vec![0u8; len];
        cursor
            .read_exact(&mut buf)
            .context("Truncated identifier table")?;
        name = String::from_utf8(buf).context("Identifier is not valid UTF-8")?;
    }

    ModuleIdentifier::from_parts(address, &name)
}

/// Table directory of a module binary.
struct BinaryHeader {
    tables: Vec<(u8, usize, usize)>,
    self_handle_idx: usize,
}

impl BinaryHeader {
    fn read(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let mut magic = [0u8; BinaryConstants::MOVE_MAGIC_SIZE];
        cursor
            .read_exact(&mut magic)
            .map_err(|_| anyhow!("Bytecode is too short to be a module"))?;
        if magic != BinaryConstants::MOVE_MAGIC {
            bail!("Bytecode does not start with the Move magic number");
        }
        let mut version = [0u8; 4];
        cursor
            .read_exact(&mut version)
            .map_err(|_| anyhow!("Bytecode is missing its version"))?;
        let version = u32::from_le_bytes(version) & VERSION_NUMBER_MASK;

        let table_count = read_index(&mut cursor).context("Missing table count")?;
        let mut tables = Vec::with_capacity(table_count);
        for _ in 0..table_count {
            let mut kind = [0u8; 1];
            cursor
                .read_exact(&mut kind)
                .map_err(|_| anyhow!("Truncated table directory"))?;
            let offset = read_index(&mut cursor).context("Truncated table directory")?;
            let len = read_index(&mut cursor).context("Truncated table directory")?;
            tables.push((kind[0], offset, len));
        }

        let content_start = usize::try_from(cursor.position())?;
        for (_, offset, len) in &mut tables {
            *offset = offset
                .checked_add(content_start)
                .ok_or_else(|| anyhow!("Table offset overflows"))?;
            if offset.checked_add(*len).map_or(true, |end| end > bytes.len()) {
                bail!("Table extends past the end of the bytecode");
            }
        }

        // Modules from version 5 on store the self handle index after the tables.
        let self_handle_idx = if version >= VERSION_5 {
            let content_end = tables
                .iter()
                .map(|(_, offset, len)| offset + len)
                .max()
                .unwrap_or(content_start);
            let mut tail = Cursor::new(&bytes[content_end..]);
            read_index(&mut tail).context("Missing self module handle index")?
        } else {
            0
        };

        Ok(Self {
            tables,
            self_handle_idx,
        })
    }

    fn table<'a>(&self, bytes: &'a [u8], kind: u8) -> Result<&'a [u8]> {
        self.tables
            .iter()
            .find(|(k, _, _)| *k == kind)
            .map(|(_, offset, len)| &bytes[*offset..*offset + *len])
            .ok_or_else(|| anyhow!("Bytecode has no table of kind {:#04x}", kind))
    }
}

fn read_index(cursor: &mut Cursor<&[u8]>) -> Result<usize> {
    Ok(usize::try_from(read_uleb128_as_u64(cursor)?)?)
}

pub fn module_shape(bytes: &[u8]) -> Result<ModuleShape> {
    Ok(ModuleShape::from_compiled(&deserialize_module(bytes)?))
}

/// Compile a stub module exposing `shape`'s functions.
///
/// Parameters and returns are typed `u64` and every body is a bare `Ret`, so
/// the result only carries the callable surface. Used to register modules for
/// which only an ABI is at hand.
pub fn synthesize_module(shape: &ModuleShape) -> Result<Vec<u8>> {
    let mut module = empty_module();
    module.address_identifiers[0] = *shape.id.address();
    module.identifiers[0] = Identifier::new(shape.id.name())?;

    for function in shape.functions.values() {
        let name = IdentifierIndex(u16::try_from(module.identifiers.len())?);
        module.identifiers.push(Identifier::new(function.name.as_str())?);
        let parameters = u64_signature(&mut module, function.param_count)?;
        let return_ = u64_signature(&mut module, function.return_count)?;

        let handle = FunctionHandleIndex(u16::try_from(module.function_handles.len())?);
        module.function_handles.push(FunctionHandle {
            module: ModuleHandleIndex(0),
            name,
            parameters,
            return_,
            type_parameters: vec![AbilitySet::EMPTY; function.type_param_count],
        });
        module.function_defs.push(FunctionDefinition {
            function: handle,
            visibility: if function.is_public {
                Visibility::Public
            } else {
                Visibility::Private
            },
            is_entry: function.is_entry,
            acquires_global_resources: vec![],
            code: Some(CodeUnit {
                locals: SignatureIndex(0),
                code: vec![Bytecode::Ret],
                jump_tables: vec![],
            }),
        });
    }

    let mut bytes = Vec::new();
    module
        .serialize_with_version(module.version, &mut bytes)
        .map_err(|e| anyhow!("Failed to serialize module {}: {}", shape.id, e))?;
    Ok(bytes)
}

fn u64_signature(module: &mut CompiledModule, len: usize) -> Result<SignatureIndex> {
    let signature = Signature(vec![SignatureToken::U64; len]);
    if let Some(pos) = module.signatures.iter().position(|s| *s == signature) {
        return Ok(SignatureIndex(u16::try_from(pos)?));
    }
    module.signatures.push(signature);
    Ok(SignatureIndex(u16::try_from(module.signatures.len() - 1)?))
}
