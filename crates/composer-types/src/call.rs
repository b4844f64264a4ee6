//! Call arguments exchanged with the composer engine.
//!
//! A [`CallArgument`] is either a concrete BCS-encoded value, the transaction
//! signer, or a reference to a return value of an earlier call in the same
//! batch. Callers thread results forward by passing the values returned from
//! one `add_batched_calls` into the next:
//!
//! ```
//! use composer_types::{CallArgument, FunctionArgument};
//!
//! // Output #0 of call #0, borrowed mutably by the next call
//! let coin = CallArgument::previous_result(0, 0).borrow_mut().unwrap();
//! let args = vec![FunctionArgument::from(CallArgument::new_signer(0)), coin.into()];
//! assert_eq!(args.len(), 2);
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// How a previous call's result is consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentOperation {
    #[default]
    Move,
    Copy,
    Borrow,
    BorrowMut,
}

/// Reference to output `return_idx` of call `call_idx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviousResult {
    pub call_idx: u16,
    pub return_idx: u16,
    pub operation: ArgumentOperation,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallArgument {
    /// BCS-encoded concrete value.
    Raw(Vec<u8>),
    /// Signer slot of the transaction.
    Signer(u16),
    PreviousResult(PreviousResult),
}

impl CallArgument {
    pub fn new_bytes(bytes: Vec<u8>) -> Self {
        CallArgument::Raw(bytes)
    }

    pub fn new_signer(index: u16) -> Self {
        CallArgument::Signer(index)
    }

    /// Result `return_idx` of call `call_idx`, moved into the consuming call.
    pub fn previous_result(call_idx: u16, return_idx: u16) -> Self {
        CallArgument::PreviousResult(PreviousResult {
            call_idx,
            return_idx,
            operation: ArgumentOperation::Move,
        })
    }

    pub fn copy(&self) -> Result<Self> {
        self.with_operation(ArgumentOperation::Copy)
    }

    pub fn borrow(&self) -> Result<Self> {
        self.with_operation(ArgumentOperation::Borrow)
    }

    pub fn borrow_mut(&self) -> Result<Self> {
        self.with_operation(ArgumentOperation::BorrowMut)
    }

    pub fn is_previous_result(&self) -> bool {
        matches!(self, CallArgument::PreviousResult(_))
    }

    fn with_operation(&self, operation: ArgumentOperation) -> Result<Self> {
        match self {
            CallArgument::PreviousResult(prev) => Ok(CallArgument::PreviousResult(PreviousResult {
                operation,
                ..*prev
            })),
            other => Err(anyhow!(
                "{:?} can only be applied to a previous call result, got {:?}",
                operation,
                other
            )),
        }
    }
}

/// One argument as supplied by the caller of `add_batched_calls`.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArgument {
    /// Already an engine argument; passed through untouched.
    Call(CallArgument),
    /// Simple value converted according to the ABI parameter type.
    Value(serde_json::Value),
    /// Raw byte input (`vector<u8>` or an opaque struct value).
    Bytes(Vec<u8>),
}

impl From<CallArgument> for FunctionArgument {
    fn from(arg: CallArgument) -> Self {
        FunctionArgument::Call(arg)
    }
}

impl From<serde_json::Value> for FunctionArgument {
    fn from(value: serde_json::Value) -> Self {
        FunctionArgument::Value(value)
    }
}

impl From<Vec<u8>> for FunctionArgument {
    fn from(bytes: Vec<u8>) -> Self {
        FunctionArgument::Bytes(bytes)
    }
}
