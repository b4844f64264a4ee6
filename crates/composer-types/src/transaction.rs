//! Script payload and transaction types.
//!
//! Layouts follow the chain's BCS encoding so that the bytes a composer engine
//! emits can be decoded into a [`ScriptPayload`]. An assembled
//! [`RawTransaction`] is accepted by the chain only when the payload's code is
//! Move script bytecode, which depends on the engine that produced it.

use anyhow::{Context, Result};
use move_core_types::account_address::AccountAddress;
use move_core_types::language_storage::TypeTag;
use move_core_types::u256::U256;
use serde::{Deserialize, Serialize};

/// Argument passed to a script's entry point.
///
/// Variant order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptArgument {
    U8(u8),
    U64(u64),
    U128(u128),
    Address(AccountAddress),
    U8Vector(Vec<u8>),
    Bool(bool),
    U16(u16),
    U32(u32),
    U256(U256),
    /// Pre-encoded BCS value.
    Serialized(Vec<u8>),
}

/// A Move script: compiled code, type arguments and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPayload {
    pub code: Vec<u8>,
    pub ty_args: Vec<TypeTag>,
    pub args: Vec<ScriptArgument>,
}

impl ScriptPayload {
    pub fn new(code: Vec<u8>, ty_args: Vec<TypeTag>, args: Vec<ScriptArgument>) -> Self {
        Self {
            code,
            ty_args,
            args,
        }
    }

    /// Decode a BCS-serialized script payload.
    pub fn from_bcs(bytes: &[u8]) -> Result<Self> {
        bcs::from_bytes(bytes).context("Failed to decode script payload")
    }

    pub fn to_bcs(&self) -> Result<Vec<u8>> {
        bcs::to_bytes(self).context("Failed to encode script payload")
    }
}

/// Transaction payload. Only scripts are produced by the composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPayload {
    Script(ScriptPayload),
}

impl TransactionPayload {
    pub fn as_script(&self) -> &ScriptPayload {
        match self {
            TransactionPayload::Script(script) => script,
        }
    }
}

impl From<ScriptPayload> for TransactionPayload {
    fn from(script: ScriptPayload) -> Self {
        TransactionPayload::Script(script)
    }
}

/// Network chain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u8);

impl ChainId {
    pub const MAINNET: ChainId = ChainId(1);
    pub const TESTNET: ChainId = ChainId(2);
    pub const LOCAL: ChainId = ChainId(4);

    pub fn new(id: u8) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u8 {
        self.0
    }
}

/// Unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: TransactionPayload,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub chain_id: ChainId,
}

impl RawTransaction {
    pub fn to_bcs(&self) -> Result<Vec<u8>> {
        bcs::to_bytes(self).context("Failed to encode raw transaction")
    }
}

/// Raw transaction plus an optional fee payer.
///
/// When the fee payer is to be chosen later the address is set to
/// [`AccountAddress::ZERO`] as a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleTransaction {
    pub raw_transaction: RawTransaction,
    pub fee_payer_address: Option<AccountAddress>,
}

impl SimpleTransaction {
    pub fn new(raw_transaction: RawTransaction) -> Self {
        Self {
            raw_transaction,
            fee_payer_address: None,
        }
    }

    /// Mark the transaction as sponsored with a placeholder fee payer.
    pub fn with_fee_payer_placeholder(mut self) -> Self {
        self.fee_payer_address = Some(AccountAddress::ZERO);
        self
    }

    pub fn has_fee_payer(&self) -> bool {
        self.fee_payer_address.is_some()
    }
}
