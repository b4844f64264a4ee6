//! Call validation against a module ABI.

use composer_types::{FunctionId, MoveFunctionAbi, MoveModuleAbi};
use move_core_types::language_storage::TypeTag;

use crate::error::{ComposerError, ComposerResult};

/// Look up the target function and check its generic arity.
pub fn validate_call<'a>(
    function_id: &FunctionId,
    abi: &'a MoveModuleAbi,
    type_args: &[TypeTag],
) -> ComposerResult<&'a MoveFunctionAbi> {
    let function = abi.function(function_id.function_name()).ok_or_else(|| {
        ComposerError::FunctionNotFound {
            module: function_id.module.to_string(),
            function: function_id.function_name().to_string(),
            in_provided_abi: false,
        }
    })?;

    let expected = function.type_param_count();
    if expected != type_args.len() {
        return Err(ComposerError::TypeArityMismatch {
            function: function_id.to_string(),
            expected,
            received: type_args.len(),
        });
    }
    Ok(function)
}

/// Early check of a caller-supplied ABI, before any network access.
pub fn check_function_in_provided_abi(
    function_id: &FunctionId,
    abi: &MoveModuleAbi,
) -> ComposerResult<()> {
    match abi.function(function_id.function_name()) {
        Some(_) => Ok(()),
        None => Err(ComposerError::FunctionNotFound {
            module: function_id.module.to_string(),
            function: function_id.function_name().to_string(),
            in_provided_abi: true,
        }),
    }
}
