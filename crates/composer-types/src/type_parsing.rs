//! Type string parsing utilities.
//!
//! Two kinds of type strings show up when composing calls:
//! - type arguments supplied by the caller (`0x1::aptos_coin::AptosCoin`),
//!   which must be fully concrete and become a [`TypeTag`];
//! - parameter types from a module ABI (`&signer`, `vector<T0>`,
//!   `0x1::object::Object<T0>`), which may mention generic parameters and
//!   references and become a [`MoveType`].
//!
//! Both go through the same parser. [`format_type_tag`] renders a tag back into
//! the canonical string handed to the composer engine.

use std::fmt;

use anyhow::{anyhow, Result};
use move_core_types::account_address::AccountAddress;
use move_core_types::identifier::Identifier;
use move_core_types::language_storage::{StructTag, TypeTag};

use crate::address::{format_address, parse_address};

/// Default nesting bound for the string parser.
pub const DEFAULT_MAX_PARSE_DEPTH: usize = 64;

/// A type string nested deeper than the parser's bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNestingError {
    pub max_depth: usize,
}

impl fmt::Display for TypeNestingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type string nested deeper than {}", self.max_depth)
    }
}

impl std::error::Error for TypeNestingError {}

/// A Move type as written in an ABI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MoveType {
    Bool,
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Address,
    Signer,
    Vector(Box<MoveType>),
    Struct {
        address: AccountAddress,
        module: Identifier,
        name: Identifier,
        type_args: Vec<MoveType>,
    },
    /// Generic type parameter `T<index>`.
    Generic(u16),
    Reference {
        mutable: bool,
        inner: Box<MoveType>,
    },
}

impl MoveType {
    /// Parse a Move type string.
    ///
    /// Supports:
    /// - Primitive types: `bool`, `u8`, `u16`, `u32`, `u64`, `u128`, `u256`, `address`, `signer`
    /// - Vector types: `vector<T>`
    /// - Struct types: `0x1::module::Struct` or `0x1::module::Struct<T1, T2>`
    /// - Generic parameters: `T0`, `T1`, ...
    /// - References: `&T`, `&mut T`
    ///
    /// # Examples
    ///
    /// ```
    /// use composer_types::MoveType;
    ///
    /// let ty = MoveType::parse("&mut 0x1::coin::Coin<T0>").unwrap();
    /// assert_eq!(ty.to_string(), "&mut 0x1::coin::Coin<T0>");
    /// ```
    pub fn parse(type_str: &str) -> Result<Self> {
        Self::parse_with_depth(type_str, DEFAULT_MAX_PARSE_DEPTH)
    }

    /// Parse a Move type string nested at most `max_depth` levels deep.
    pub fn parse_with_depth(type_str: &str, max_depth: usize) -> Result<Self> {
        parse_at_depth(type_str, 0, max_depth)
    }

    /// Convert to a concrete TypeTag. Fails on generic parameters and references.
    pub fn to_type_tag(&self) -> Result<TypeTag> {
        Ok(match self {
            MoveType::Bool => TypeTag::Bool,
            MoveType::U8 => TypeTag::U8,
            MoveType::U16 => TypeTag::U16,
            MoveType::U32 => TypeTag::U32,
            MoveType::U64 => TypeTag::U64,
            MoveType::U128 => TypeTag::U128,
            MoveType::U256 => TypeTag::U256,
            MoveType::Address => TypeTag::Address,
            MoveType::Signer => TypeTag::Signer,
            MoveType::Vector(inner) => TypeTag::Vector(Box::new(inner.to_type_tag()?)),
            MoveType::Struct {
                address,
                module,
                name,
                type_args,
            } => TypeTag::Struct(Box::new(StructTag {
                address: *address,
                module: module.clone(),
                name: name.clone(),
                type_params: type_args
                    .iter()
                    .map(MoveType::to_type_tag)
                    .collect::<Result<Vec<_>>>()?,
            })),
            MoveType::Generic(idx) => {
                return Err(anyhow!("Type parameter T{} is not a concrete type", idx))
            }
            MoveType::Reference { .. } => {
                return Err(anyhow!("Reference type '{}' is not a concrete type", self))
            }
        })
    }

    /// Whether this is the struct `address::module::name` (type arguments ignored).
    pub fn is_struct(&self, expected_address: AccountAddress, expected_module: &str, expected_name: &str) -> bool {
        matches!(
            self,
            MoveType::Struct { address, module, name, .. }
                if *address == expected_address
                    && module.as_str() == expected_module
                    && name.as_str() == expected_name
        )
    }
}

impl From<&TypeTag> for MoveType {
    fn from(tag: &TypeTag) -> Self {
        match tag {
            TypeTag::Bool => MoveType::Bool,
            TypeTag::U8 => MoveType::U8,
            TypeTag::U16 => MoveType::U16,
            TypeTag::U32 => MoveType::U32,
            TypeTag::U64 => MoveType::U64,
            TypeTag::U128 => MoveType::U128,
            TypeTag::U256 => MoveType::U256,
            TypeTag::Address => MoveType::Address,
            TypeTag::Signer => MoveType::Signer,
            TypeTag::Vector(inner) => MoveType::Vector(Box::new(MoveType::from(inner.as_ref()))),
            TypeTag::Struct(st) => MoveType::Struct {
                address: st.address,
                module: st.module.clone(),
                name: st.name.clone(),
                type_args: st.type_params.iter().map(MoveType::from).collect(),
            },
        }
    }
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveType::Bool => write!(f, "bool"),
            MoveType::U8 => write!(f, "u8"),
            MoveType::U16 => write!(f, "u16"),
            MoveType::U32 => write!(f, "u32"),
            MoveType::U64 => write!(f, "u64"),
            MoveType::U128 => write!(f, "u128"),
            MoveType::U256 => write!(f, "u256"),
            MoveType::Address => write!(f, "address"),
            MoveType::Signer => write!(f, "signer"),
            MoveType::Vector(inner) => write!(f, "vector<{}>", inner),
            MoveType::Struct {
                address,
                module,
                name,
                type_args,
            } => {
                write!(f, "{}::{}::{}", format_address(address), module, name)?;
                if !type_args.is_empty() {
                    let args: Vec<String> = type_args.iter().map(|t| t.to_string()).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            MoveType::Generic(idx) => write!(f, "T{}", idx),
            MoveType::Reference { mutable, inner } => {
                if *mutable {
                    write!(f, "&mut {}", inner)
                } else {
                    write!(f, "&{}", inner)
                }
            }
        }
    }
}

/// Parse a Move type string into a concrete TypeTag.
///
/// # Examples
///
/// ```
/// use composer_types::parse_type_tag;
///
/// let tag = parse_type_tag("0x1::coin::Coin<0x1::aptos_coin::AptosCoin>").unwrap();
/// assert!(parse_type_tag("T0").is_err());
/// ```
pub fn parse_type_tag(type_str: &str) -> Result<TypeTag> {
    parse_type_tag_with_depth(type_str, DEFAULT_MAX_PARSE_DEPTH)
}

/// [`parse_type_tag`] with an explicit nesting bound.
pub fn parse_type_tag_with_depth(type_str: &str, max_depth: usize) -> Result<TypeTag> {
    MoveType::parse_with_depth(type_str, max_depth)?
        .to_type_tag()
        .map_err(|e| anyhow!("Invalid type argument '{}': {}", type_str.trim(), e))
}

/// Render a TypeTag as its canonical type string.
pub fn format_type_tag(tag: &TypeTag) -> String {
    MoveType::from(tag).to_string()
}

fn parse_at_depth(type_str: &str, depth: usize, max_depth: usize) -> Result<MoveType> {
    if depth > max_depth {
        return Err(TypeNestingError { max_depth }.into());
    }
    let type_str = type_str.trim();
    if type_str.is_empty() {
        return Err(anyhow!("Empty type string"));
    }

    if let Some(rest) = type_str.strip_prefix("&mut ") {
        return Ok(MoveType::Reference {
            mutable: true,
            inner: Box::new(parse_at_depth(rest, depth + 1, max_depth)?),
        });
    }
    if let Some(rest) = type_str.strip_prefix('&') {
        return Ok(MoveType::Reference {
            mutable: false,
            inner: Box::new(parse_at_depth(rest, depth + 1, max_depth)?),
        });
    }

    match type_str {
        "bool" => return Ok(MoveType::Bool),
        "u8" => return Ok(MoveType::U8),
        "u16" => return Ok(MoveType::U16),
        "u32" => return Ok(MoveType::U32),
        "u64" => return Ok(MoveType::U64),
        "u128" => return Ok(MoveType::U128),
        "u256" => return Ok(MoveType::U256),
        "address" => return Ok(MoveType::Address),
        "signer" => return Ok(MoveType::Signer),
        _ => {}
    }

    if let Some(idx) = type_str
        .strip_prefix('T')
        .filter(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
        .and_then(|d| d.parse::<u16>().ok())
    {
        return Ok(MoveType::Generic(idx));
    }

    if let Some(inner) = type_str
        .strip_prefix("vector<")
        .and_then(|s| s.strip_suffix('>'))
    {
        return Ok(MoveType::Vector(Box::new(parse_at_depth(inner, depth + 1, max_depth)?)));
    }

    // Struct types: 0x<address>::<module>::<name><type_args>
    let (base_type, type_args_str) = match type_str.find('<') {
        Some(angle_pos) => {
            let args = type_str[angle_pos + 1..]
                .strip_suffix('>')
                .ok_or_else(|| anyhow!("Unbalanced '<' in type '{}'", type_str))?;
            (&type_str[..angle_pos], Some(args))
        }
        None => (type_str, None),
    };

    let parts: Vec<&str> = base_type.split("::").map(str::trim).collect();
    if parts.len() != 3 {
        return Err(anyhow!("Unrecognized type '{}'", type_str));
    }

    let address = parse_address(parts[0], "struct address")?;
    let module = Identifier::new(parts[1])
        .map_err(|e| anyhow!("Invalid module name in '{}': {}", type_str, e))?;
    let name = Identifier::new(parts[2])
        .map_err(|e| anyhow!("Invalid struct name in '{}': {}", type_str, e))?;

    let type_args = match type_args_str {
        Some(args) => split_type_params(args)?
            .into_iter()
            .map(|arg| parse_at_depth(arg, depth + 1, max_depth))
            .collect::<Result<Vec<_>>>()?,
        None => vec![],
    };

    Ok(MoveType::Struct {
        address,
        module,
        name,
        type_args,
    })
}

/// Split type parameters respecting nested angle brackets.
///
/// Given "A, B<C, D>, E", returns ["A", "B<C, D>", "E"] by tracking bracket depth.
/// Fails on unbalanced brackets or empty entries.
pub fn split_type_params(s: &str) -> Result<Vec<&str>> {
    let mut result = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth < 0 {
                    return Err(anyhow!("Unbalanced '>' in type parameters '{}'", s));
                }
            }
            ',' if depth == 0 => {
                result.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(anyhow!("Unbalanced '<' in type parameters '{}'", s));
    }
    result.push(s[start..].trim());

    if result.iter().any(|p| p.is_empty()) {
        return Err(anyhow!("Empty entry in type parameters '{}'", s));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert!(matches!(parse_type_tag("bool"), Ok(TypeTag::Bool)));
        assert!(matches!(parse_type_tag("u64"), Ok(TypeTag::U64)));
        assert!(matches!(parse_type_tag(" u256 "), Ok(TypeTag::U256)));
        assert!(matches!(parse_type_tag("address"), Ok(TypeTag::Address)));
        assert!(matches!(parse_type_tag("signer"), Ok(TypeTag::Signer)));
    }

    #[test]
    fn test_parse_vector() {
        let tag = parse_type_tag("vector<vector<u8>>").unwrap();
        assert_eq!(format_type_tag(&tag), "vector<vector<u8>>");
    }

    #[test]
    fn test_parse_struct() {
        let tag = parse_type_tag("0x1::coin::Coin<0x1::aptos_coin::AptosCoin>").unwrap();
        if let TypeTag::Struct(s) = &tag {
            assert_eq!(s.address, AccountAddress::ONE);
            assert_eq!(s.module.as_str(), "coin");
            assert_eq!(s.name.as_str(), "Coin");
            assert_eq!(s.type_params.len(), 1);
        } else {
            panic!("Expected struct type");
        }
        assert_eq!(
            format_type_tag(&tag),
            "0x1::coin::Coin<0x1::aptos_coin::AptosCoin>"
        );
    }

    #[test]
    fn test_format_canonicalizes_addresses() {
        let tag = parse_type_tag(
            "0x0000000000000000000000000000000000000000000000000000000000000001::string::String",
        )
        .unwrap();
        assert_eq!(format_type_tag(&tag), "0x1::string::String");

        let tag = parse_type_tag("0xcafe::pool::Pool<u64,0x1::string::String>").unwrap();
        assert_eq!(
            format_type_tag(&tag),
            "0x000000000000000000000000000000000000000000000000000000000000cafe::pool::Pool<u64, 0x1::string::String>"
        );
    }

    #[test]
    fn test_parse_abi_types() {
        assert_eq!(
            MoveType::parse("&signer").unwrap(),
            MoveType::Reference {
                mutable: false,
                inner: Box::new(MoveType::Signer)
            }
        );
        assert_eq!(MoveType::parse("T3").unwrap(), MoveType::Generic(3));
        let obj = MoveType::parse("0x1::object::Object<T0>").unwrap();
        assert!(obj.is_struct(AccountAddress::ONE, "object", "Object"));
        assert_eq!(obj.to_string(), "0x1::object::Object<T0>");
        assert!(obj.to_type_tag().is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_type_tag("").is_err());
        assert!(parse_type_tag("u7").is_err());
        assert!(parse_type_tag("0x1::coin").is_err());
        assert!(parse_type_tag("0x1::coin::Coin<").is_err());
        assert!(parse_type_tag("0x1::coin::Coin<>").is_err());
        assert!(parse_type_tag("0x1::coin::Coin<u8,>").is_err());
        assert!(parse_type_tag("vector<u8").is_err());
        assert!(parse_type_tag("&u8").is_err());
    }

    #[test]
    fn test_parse_depth_bound() {
        let deep = format!("{}u8{}", "vector<".repeat(200), ">".repeat(200));
        let err = parse_type_tag(&deep).unwrap_err();
        assert!(err.to_string().contains("nested deeper than 64"));

        assert!(parse_type_tag_with_depth(&deep, 200).is_ok());
        let err = parse_type_tag_with_depth("vector<vector<u8>>", 1).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TypeNestingError>(),
            Some(&TypeNestingError { max_depth: 1 })
        );
    }

    #[test]
    fn test_split_type_params() {
        let params = split_type_params("u64, 0x1::coin::Coin<0x1::aptos_coin::AptosCoin>, bool").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[0], "u64");
        assert_eq!(params[1], "0x1::coin::Coin<0x1::aptos_coin::AptosCoin>");
        assert_eq!(params[2], "bool");

        assert!(split_type_params("A>, B").is_err());
        assert!(split_type_params("A<B, C").is_err());
    }
}
