//! Conversion of caller-supplied arguments into engine call arguments.
//!
//! Arguments that are already [`CallArgument`]s pass through untouched. Every
//! other argument is BCS-encoded against the ABI parameter type at the same
//! position, after the function's generic parameters have been replaced by the
//! call's type arguments.
//!
//! Supported JSON inputs:
//!
//! | Parameter type             | Accepted JSON                          |
//! |----------------------------|----------------------------------------|
//! | `bool`                     | `true` / `false`                       |
//! | `u8` .. `u256`             | number or decimal string               |
//! | `address`                  | hex string                             |
//! | `vector<u8>`               | `0x` hex string or array of numbers    |
//! | `vector<T>`                | array                                  |
//! | `0x1::string::String`      | string                                 |
//! | `0x1::object::Object<T>`   | address string                         |
//! | `0x1::option::Option<T>`   | `null` or a value of `T`               |
//!
//! Byte inputs are accepted for `vector<u8>`, `0x1::string::String` (UTF-8) and
//! any struct type. Bytes given for a struct are forwarded as the already
//! encoded value without checking them against the struct layout.

use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use composer_types::address::{parse_address, parse_hex_bytes};
use composer_types::{CallArgument, FunctionArgument, FunctionId, MoveFunctionAbi, MoveType};
use move_core_types::account_address::AccountAddress;
use move_core_types::annotated_value::MoveValue;
use move_core_types::language_storage::TypeTag;
use move_core_types::u256::U256;
use serde_json::Value;

use crate::error::{ComposerError, ComposerResult};

/// Convert every argument of a call.
pub fn convert_arguments(
    function_id: &FunctionId,
    function: &MoveFunctionAbi,
    args: Vec<FunctionArgument>,
    type_args: &[TypeTag],
) -> ComposerResult<Vec<CallArgument>> {
    if args.len() != function.params.len() {
        return Err(ComposerError::invalid_input(format!(
            "Function '{}' expects {} argument(s), received {}",
            function_id,
            function.params.len(),
            args.len()
        )));
    }

    args.into_iter()
        .zip(&function.params)
        .enumerate()
        .map(|(index, (arg, param))| {
            convert_argument(arg, param, type_args).map_err(|(expected_type, e)| {
                ComposerError::InvalidArgument {
                    function: function_id.to_string(),
                    index,
                    expected_type,
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

fn convert_argument(
    arg: FunctionArgument,
    param: &str,
    type_args: &[TypeTag],
) -> std::result::Result<CallArgument, (String, anyhow::Error)> {
    match arg {
        FunctionArgument::Call(call) => Ok(call),
        FunctionArgument::Value(json) => {
            encode_for_param(param, type_args, |ty| encode_value(ty, &json))
        }
        FunctionArgument::Bytes(bytes) => {
            encode_for_param(param, type_args, |ty| encode_bytes(ty, &bytes))
        }
    }
}

fn encode_for_param(
    param: &str,
    type_args: &[TypeTag],
    encode: impl FnOnce(&MoveType) -> Result<Vec<u8>>,
) -> std::result::Result<CallArgument, (String, anyhow::Error)> {
    let param_type = MoveType::parse(param)
        .and_then(|ty| substitute_type_params(&ty, type_args))
        .map_err(|e| (param.to_string(), e))?;
    encode(strip_reference(&param_type))
        .map(CallArgument::Raw)
        .map_err(|e| (param_type.to_string(), e))
}

/// Replace `T<i>` with the i-th type argument.
pub fn substitute_type_params(ty: &MoveType, type_args: &[TypeTag]) -> Result<MoveType> {
    Ok(match ty {
        MoveType::Generic(idx) => type_args
            .get(*idx as usize)
            .map(MoveType::from)
            .ok_or_else(|| anyhow!("Type parameter T{} has no type argument", idx))?,
        MoveType::Vector(inner) => {
            MoveType::Vector(Box::new(substitute_type_params(inner, type_args)?))
        }
        MoveType::Struct {
            address,
            module,
            name,
            type_args: params,
        } => MoveType::Struct {
            address: *address,
            module: module.clone(),
            name: name.clone(),
            type_args: params
                .iter()
                .map(|p| substitute_type_params(p, type_args))
                .collect::<Result<Vec<_>>>()?,
        },
        MoveType::Reference { mutable, inner } => MoveType::Reference {
            mutable: *mutable,
            inner: Box::new(substitute_type_params(inner, type_args)?),
        },
        other => other.clone(),
    })
}

/// A reference parameter takes a value of its referent type.
fn strip_reference(ty: &MoveType) -> &MoveType {
    match ty {
        MoveType::Reference { inner, .. } => strip_reference(inner),
        other => other,
    }
}

fn is_string(ty: &MoveType) -> bool {
    ty.is_struct(AccountAddress::ONE, "string", "String")
}

fn is_object(ty: &MoveType) -> bool {
    ty.is_struct(AccountAddress::ONE, "object", "Object")
}

fn is_option(ty: &MoveType) -> bool {
    ty.is_struct(AccountAddress::ONE, "option", "Option")
}

fn encode_value(ty: &MoveType, json: &Value) -> Result<Vec<u8>> {
    to_move_value(ty, json)?
        .simple_serialize()
        .ok_or_else(|| anyhow!("BCS serialization failed"))
}

fn encode_bytes(ty: &MoveType, bytes: &[u8]) -> Result<Vec<u8>> {
    match ty {
        MoveType::Vector(inner) if **inner == MoveType::U8 => Ok(bcs::to_bytes(bytes)?),
        t if is_string(t) => {
            std::str::from_utf8(bytes).map_err(|e| anyhow!("string bytes are not UTF-8: {}", e))?;
            Ok(bcs::to_bytes(bytes)?)
        }
        // Opaque struct value; its layout is not checked.
        MoveType::Struct { .. } => Ok(bytes.to_vec()),
        other => bail!("byte input cannot be used for a {} parameter", other),
    }
}

fn to_move_value(ty: &MoveType, json: &Value) -> Result<MoveValue> {
    Ok(match ty {
        MoveType::Bool => MoveValue::Bool(
            json.as_bool()
                .ok_or_else(|| anyhow!("expected a boolean, got {}", json))?,
        ),
        MoveType::U8 => MoveValue::U8(parse_uint(json, "u8")?),
        MoveType::U16 => MoveValue::U16(parse_uint(json, "u16")?),
        MoveType::U32 => MoveValue::U32(parse_uint(json, "u32")?),
        MoveType::U64 => MoveValue::U64(parse_uint(json, "u64")?),
        MoveType::U128 => MoveValue::U128(parse_uint(json, "u128")?),
        MoveType::U256 => MoveValue::U256(parse_u256(json)?),
        MoveType::Address => MoveValue::Address(parse_address_value(json)?),
        MoveType::Signer => {
            bail!("signer values cannot be passed directly, use CallArgument::Signer")
        }
        MoveType::Vector(inner) => {
            if let (MoveType::U8, Value::String(hex)) = (inner.as_ref(), json) {
                let bytes = parse_hex_bytes(hex, "vector<u8>")?;
                return Ok(MoveValue::Vector(bytes.into_iter().map(MoveValue::U8).collect()));
            }
            let items = json
                .as_array()
                .ok_or_else(|| anyhow!("expected an array, got {}", json))?;
            MoveValue::Vector(
                items
                    .iter()
                    .map(|item| to_move_value(inner, item))
                    .collect::<Result<Vec<_>>>()?,
            )
        }
        t if is_string(t) => {
            let s = json
                .as_str()
                .ok_or_else(|| anyhow!("expected a string, got {}", json))?;
            MoveValue::Vector(s.bytes().map(MoveValue::U8).collect())
        }
        t if is_object(t) => MoveValue::Address(parse_address_value(json)?),
        MoveType::Struct { type_args, .. } if is_option(ty) => {
            let inner = type_args
                .first()
                .ok_or_else(|| anyhow!("Option without a type argument"))?;
            if json.is_null() {
                MoveValue::Vector(vec![])
            } else {
                MoveValue::Vector(vec![to_move_value(strip_reference(inner), json)?])
            }
        }
        MoveType::Struct { .. } => {
            bail!("struct {} cannot be built from JSON, pass its encoded bytes", ty)
        }
        MoveType::Generic(idx) => bail!("unresolved type parameter T{}", idx),
        MoveType::Reference { inner, .. } => to_move_value(inner, json)?,
    })
}

fn parse_uint<T>(json: &Value, type_name: &str) -> Result<T>
where
    T: FromStr + TryFrom<u64>,
{
    match json {
        Value::Number(n) => {
            let n = n
                .as_u64()
                .ok_or_else(|| anyhow!("{} is not a non-negative integer", n))?;
            T::try_from(n).map_err(|_| anyhow!("{} is out of range for {}", n, type_name))
        }
        Value::String(s) => s
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow!("'{}' is not a valid {}", s, type_name)),
        other => bail!("expected a {} number or decimal string, got {}", type_name, other),
    }
}

fn parse_u256(json: &Value) -> Result<U256> {
    match json {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| anyhow!("{} is not a non-negative integer", n)),
        Value::String(s) => {
            U256::from_str(s.trim()).map_err(|_| anyhow!("'{}' is not a valid u256", s))
        }
        other => bail!("expected a u256 number or decimal string, got {}", other),
    }
}

fn parse_address_value(json: &Value) -> Result<AccountAddress> {
    let s = json
        .as_str()
        .ok_or_else(|| anyhow!("expected an address string, got {}", json))?;
    parse_address(s, "address argument")
}
