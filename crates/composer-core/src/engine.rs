//! Composer engine abstraction.
//!
//! The engine is the component that turns registered modules and a list of
//! batched calls into script bytes. A session only talks to it through
//! [`ComposerEngine`]:
//!
//! - `store_module` registers a module's bytecode so calls into it can be linked
//! - `add_batched_call` appends a call and returns placeholders for its results
//! - `generate_bytecode` emits the BCS-encoded script payload
//!
//! [`CallPlanEngine`] is the bundled implementation. It checks each call
//! against the callable surface of the registered modules and emits a script
//! payload whose code section carries the BCS-encoded [`CallPlan`]. That code
//! is a plan, not Move script bytecode: the chain does not execute it. Plug an
//! engine that lowers calls to script bytecode into
//! [`ComposerContext`](crate::ComposerContext) for transactions meant to be
//! submitted.

use std::collections::{BTreeMap, HashSet};

use anyhow::{anyhow, bail, Context, Result};
use composer_types::{
    ArgumentOperation, CallArgument, ModuleIdentifier, MoveModuleAbi, PreviousResult,
    ScriptPayload,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::bytecode::{module_identifier, module_shape, ModuleShape};

/// Capability that lowers batched calls into a script.
pub trait ComposerEngine: Send {
    /// Register compiled module bytes.
    fn store_module(&mut self, bytecode: &[u8]) -> Result<()>;

    /// Register compiled module bytes together with the module's ABI.
    fn store_module_with_abi(&mut self, bytecode: &[u8], _abi: Option<&MoveModuleAbi>) -> Result<()> {
        self.store_module(bytecode)
    }

    /// Append a call. Returns one argument per declared return value.
    fn add_batched_call(
        &mut self,
        module: &ModuleIdentifier,
        function: &str,
        type_args: &[String],
        args: Vec<CallArgument>,
    ) -> Result<Vec<CallArgument>>;

    /// Emit the BCS-encoded script payload for all calls added so far.
    fn generate_bytecode(&mut self, with_metadata: bool) -> Result<Vec<u8>>;
}

/// One call in a [`CallPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCall {
    /// Canonical `address::module`
    pub module: String,
    pub function: String,
    pub type_args: Vec<String>,
    pub args: Vec<CallArgument>,
    pub return_count: u16,
}

/// Ordered calls of a composed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallPlan {
    pub signer_count: u16,
    pub calls: Vec<PlannedCall>,
    /// Registered modules, present when emitted with metadata.
    pub modules: Option<Vec<String>>,
}

impl CallPlan {
    /// Decode the plan carried in a script's code section.
    pub fn from_script(script: &ScriptPayload) -> Result<Self> {
        bcs::from_bytes(&script.code).context("Script code does not contain a call plan")
    }
}

/// Bundled engine producing BCS call plans.
///
/// The callable surface of a module comes from its ABI. Modules stored without
/// one are decoded with `move-binary-format`; if that fails they are registered
/// by identity only and cannot be called.
#[derive(Debug)]
pub struct CallPlanEngine {
    signer_count: u16,
    modules: BTreeMap<ModuleIdentifier, ModuleShape>,
    calls: Vec<PlannedCall>,
    moved: HashSet<(u16, u16)>,
}

impl CallPlanEngine {
    /// Engine for a transaction with exactly one signer.
    pub fn single_signer() -> Self {
        Self::with_signers(1)
    }

    pub fn with_signers(signer_count: u16) -> Self {
        Self {
            signer_count,
            modules: BTreeMap::new(),
            calls: Vec::new(),
            moved: HashSet::new(),
        }
    }

    /// Register a module surface directly, e.g. one derived from an ABI.
    pub fn register_shape(&mut self, shape: ModuleShape) {
        self.modules.entry(shape.id.clone()).or_insert(shape);
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    fn check_argument(&mut self, index: usize, arg: &CallArgument) -> Result<()> {
        match arg {
            CallArgument::Raw(_) => Ok(()),
            CallArgument::Signer(slot) => {
                if *slot >= self.signer_count {
                    bail!(
                        "Argument {} refers to signer {} but the transaction has {} signer(s)",
                        index,
                        slot,
                        self.signer_count
                    );
                }
                Ok(())
            }
            CallArgument::PreviousResult(PreviousResult {
                call_idx,
                return_idx,
                operation,
            }) => {
                let producer = self.calls.get(*call_idx as usize).ok_or_else(|| {
                    anyhow!(
                        "Argument {} refers to call {} which has not been added",
                        index,
                        call_idx
                    )
                })?;
                if *return_idx >= producer.return_count {
                    bail!(
                        "Argument {} refers to result {} of call {} which returns {} value(s)",
                        index,
                        return_idx,
                        call_idx,
                        producer.return_count
                    );
                }
                let key = (*call_idx, *return_idx);
                if self.moved.contains(&key) {
                    bail!(
                        "Argument {} uses result {} of call {} after it was moved",
                        index,
                        return_idx,
                        call_idx
                    );
                }
                if *operation == ArgumentOperation::Move {
                    self.moved.insert(key);
                }
                Ok(())
            }
        }
    }
}

impl ComposerEngine for CallPlanEngine {
    fn store_module(&mut self, bytecode: &[u8]) -> Result<()> {
        self.store_module_with_abi(bytecode, None)
    }

    fn store_module_with_abi(&mut self, bytecode: &[u8], abi: Option<&MoveModuleAbi>) -> Result<()> {
        let id = module_identifier(bytecode)?;
        let shape = match abi {
            Some(abi) => {
                let shape = ModuleShape::from_abi(abi)?;
                if shape.id != id {
                    bail!("ABI of '{}' does not describe bytecode of '{}'", shape.id, id);
                }
                shape
            }
            None => module_shape(bytecode).unwrap_or_else(|e| {
                trace!(module = %id, error = %e, "no callable surface for module");
                ModuleShape::opaque(id)
            }),
        };
        trace!(module = %shape.id, functions = shape.functions.len(), "engine registered module");
        self.register_shape(shape);
        Ok(())
    }

    fn add_batched_call(
        &mut self,
        module: &ModuleIdentifier,
        function: &str,
        type_args: &[String],
        args: Vec<CallArgument>,
    ) -> Result<Vec<CallArgument>> {
        let shape = self
            .modules
            .get(module)
            .ok_or_else(|| anyhow!("Module '{}' has not been stored in the engine", module))?;
        let func = shape
            .function(function)
            .ok_or_else(|| anyhow!("Function '{}::{}' does not exist", module, function))?
            .clone();

        if !func.is_public {
            bail!("Function '{}::{}' is not public", module, function);
        }
        if func.type_param_count != type_args.len() {
            bail!(
                "Function '{}::{}' takes {} type argument(s), got {}",
                module,
                function,
                func.type_param_count,
                type_args.len()
            );
        }
        if func.param_count != args.len() {
            bail!(
                "Function '{}::{}' takes {} argument(s), got {}",
                module,
                function,
                func.param_count,
                args.len()
            );
        }

        let call_idx = u16::try_from(self.calls.len())
            .map_err(|_| anyhow!("Too many calls in one script"))?;
        let return_count = u16::try_from(func.return_count)
            .map_err(|_| anyhow!("Function '{}::{}' returns too many values", module, function))?;

        // A rejected call must not consume any results.
        let moved_before = self.moved.clone();
        for (index, arg) in args.iter().enumerate() {
            if let Err(e) = self.check_argument(index, arg) {
                self.moved = moved_before;
                return Err(e.context(format!("Invalid call to '{}::{}'", module, function)));
            }
        }

        self.calls.push(PlannedCall {
            module: module.to_string(),
            function: function.to_string(),
            type_args: type_args.to_vec(),
            args,
            return_count,
        });

        Ok((0..return_count)
            .map(|return_idx| CallArgument::previous_result(call_idx, return_idx))
            .collect())
    }

    fn generate_bytecode(&mut self, with_metadata: bool) -> Result<Vec<u8>> {
        let plan = CallPlan {
            signer_count: self.signer_count,
            calls: self.calls.clone(),
            modules: with_metadata
                .then(|| self.modules.keys().map(|id| id.to_string()).collect()),
        };
        let code = bcs::to_bytes(&plan).context("Failed to encode call plan")?;
        ScriptPayload::new(code, vec![], vec![]).to_bcs()
    }
}
