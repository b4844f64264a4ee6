//! Batched call requests.

use composer_types::{FunctionArgument, MoveModuleAbi};

/// One call to add to a composer session.
///
/// ```
/// use composer_core::BatchedCallRequest;
/// use composer_types::CallArgument;
///
/// let request = BatchedCallRequest::new("0x1::coin::withdraw")
///     .type_argument("0x1::aptos_coin::AptosCoin")
///     .argument(CallArgument::new_signer(0))
///     .argument(serde_json::json!(100));
/// assert!(request.allow_fetch);
/// ```
#[derive(Debug, Clone)]
pub struct BatchedCallRequest {
    /// `address::module::function`
    pub function: String,
    pub type_arguments: Vec<String>,
    pub function_arguments: Vec<FunctionArgument>,
    /// ABI to validate against instead of a fetched one.
    pub module_abi: Option<MoveModuleAbi>,
    /// Compiled modules to register before the call.
    pub module_bytecode: Vec<Vec<u8>>,
    /// Fetch missing modules from the network. Defaults to true.
    pub allow_fetch: bool,
}

impl BatchedCallRequest {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            type_arguments: Vec::new(),
            function_arguments: Vec::new(),
            module_abi: None,
            module_bytecode: Vec::new(),
            allow_fetch: true,
        }
    }

    pub fn type_argument(mut self, type_arg: impl Into<String>) -> Self {
        self.type_arguments.push(type_arg.into());
        self
    }

    pub fn type_arguments<I, S>(mut self, type_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_arguments
            .extend(type_args.into_iter().map(Into::into));
        self
    }

    pub fn argument(mut self, arg: impl Into<FunctionArgument>) -> Self {
        self.function_arguments.push(arg.into());
        self
    }

    pub fn arguments<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<FunctionArgument>,
    {
        self.function_arguments
            .extend(args.into_iter().map(Into::into));
        self
    }

    pub fn module_abi(mut self, abi: MoveModuleAbi) -> Self {
        self.module_abi = Some(abi);
        self
    }

    pub fn module_bytecode(mut self, bytecode: Vec<u8>) -> Self {
        self.module_bytecode.push(bytecode);
        self
    }

    pub fn allow_fetch(mut self, allow_fetch: bool) -> Self {
        self.allow_fetch = allow_fetch;
        self
    }
}
