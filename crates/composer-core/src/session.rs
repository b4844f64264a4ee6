//! Composer sessions.
//!
//! A [`ComposerSession`] accumulates batched calls for one script. It owns an
//! engine instance and the set of modules already pushed to that engine, and
//! shares the process-wide [`ModuleCache`](crate::cache::ModuleCache) through
//! its [`ComposerContext`].
//!
//! ## Usage
//!
//! ```ignore
//! let context = ComposerContext::from_env(Network::Testnet, script_engine_factory())?;
//! let mut session = ComposerSession::new(context);
//!
//! let coin = session
//!     .add_batched_calls(
//!         BatchedCallRequest::new("0x1::coin::withdraw")
//!             .type_argument("0x1::aptos_coin::AptosCoin")
//!             .argument(CallArgument::new_signer(0))
//!             .argument(serde_json::json!(1000)),
//!     )
//!     .await?;
//! session
//!     .add_batched_calls(
//!         BatchedCallRequest::new("0x1::coin::deposit")
//!             .type_argument("0x1::aptos_coin::AptosCoin")
//!             .argument(serde_json::json!("0xbob"))
//!             .argument(coin[0].clone()),
//!     )
//!     .await?;
//!
//! let payload = session.build_payload()?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use composer_types::{
    format_type_tag, parse_type_tag_with_depth, CallArgument, FunctionId, ModuleDefinition,
    ModuleIdentifier, MoveModuleAbi, ScriptPayload, TransactionPayload, TypeNestingError,
};
use move_core_types::language_storage::TypeTag;
use tracing::{debug, trace};

use crate::arguments::convert_arguments;
use crate::bytecode::module_identifier;
use crate::context::ComposerContext;
use crate::engine::ComposerEngine;
use crate::error::{ComposerError, ComposerResult};
use crate::request::BatchedCallRequest;
use crate::validator::{check_function_in_provided_abi, validate_call};

const NOT_CACHED_OFFLINE: &str = "not cached and fetching is disabled";

/// Builder of one composed script.
pub struct ComposerSession {
    context: ComposerContext,
    engine: Box<dyn ComposerEngine>,
    pushed: HashSet<ModuleIdentifier>,
}

impl ComposerSession {
    pub fn new(context: ComposerContext) -> Self {
        let engine = context.new_engine();
        Self {
            context,
            engine,
            pushed: HashSet::new(),
        }
    }

    pub fn context(&self) -> &ComposerContext {
        &self.context
    }

    /// Whether `id` has been registered with this session's engine.
    pub fn is_pushed(&self, id: &ModuleIdentifier) -> bool {
        self.pushed.contains(id)
    }

    /// Modules registered with this session's engine, sorted.
    pub fn pushed_modules(&self) -> Vec<ModuleIdentifier> {
        let mut ids: Vec<_> = self.pushed.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Cache a module and register it with the engine.
    ///
    /// The identifier is `module_id` if given, else derived from the
    /// definition's ABI. The cache keeps the first definition stored under an
    /// identifier, and the engine sees each identifier once per session.
    pub fn store_module(
        &mut self,
        definition: impl Into<Arc<ModuleDefinition>>,
        module_id: Option<ModuleIdentifier>,
    ) -> ComposerResult<()> {
        let definition = definition.into();
        let id = match module_id {
            Some(id) => id,
            None => match definition.module_id() {
                Some(Ok(id)) => id,
                Some(Err(e)) => {
                    return Err(ComposerError::configuration(format!(
                        "Module ID or ABI must be provided to store a module: {:#}",
                        e
                    )))
                }
                None => {
                    return Err(ComposerError::configuration(
                        "Module ID or ABI must be provided to store a module",
                    ))
                }
            },
        };

        self.context.cache.put(id.clone(), definition.clone());
        let stored = self.context.cache.get(&id).unwrap_or(definition);
        self.push_module(&id, &stored)
    }

    /// Register a cached definition with the engine unless already pushed.
    fn push_module(&mut self, id: &ModuleIdentifier, definition: &ModuleDefinition) -> ComposerResult<()> {
        if self.pushed.contains(id) {
            trace!(module = %id, "module already pushed");
            return Ok(());
        }
        self.engine
            .store_module_with_abi(&definition.bytecode, definition.abi.as_ref())
            .map_err(ComposerError::Engine)?;
        self.pushed.insert(id.clone());
        debug!(module = %id, "pushed module to engine");
        Ok(())
    }

    /// Fetch a module from the network and store it.
    pub(crate) async fn fetch_and_store(&mut self, id: &ModuleIdentifier) -> ComposerResult<()> {
        let fetcher = self.context.fetcher.clone();
        debug!(module = %id, ledger_version = ?self.context.settings.ledger_version, "fetching module");
        let definition = fetcher
            .fetch_module(id.address(), id.name(), self.context.settings.ledger_version)
            .await
            .map_err(ComposerError::Fetch)?
            .ok_or_else(|| ComposerError::missing_module(id, "not found on chain"))?;
        self.store_module(definition, Some(id.clone()))
    }

    /// Make sure `id` is registered with the engine, from the cache or the
    /// network.
    async fn ensure_module(&mut self, id: &ModuleIdentifier, allow_fetch: bool) -> ComposerResult<()> {
        if self.pushed.contains(id) {
            return Ok(());
        }
        if let Some(definition) = self.context.cache.get(id) {
            return self.push_module(id, &definition);
        }
        if !allow_fetch {
            return Err(ComposerError::missing_module(id, NOT_CACHED_OFFLINE));
        }
        self.fetch_and_store(id).await
    }

    /// ABI to validate a call against when none was supplied.
    async fn resolve_abi(&mut self, module: &ModuleIdentifier, allow_fetch: bool) -> ComposerResult<MoveModuleAbi> {
        if let Some(abi) = self.context.cache.get(module).and_then(|m| m.abi.clone()) {
            return Ok(abi);
        }
        if allow_fetch {
            let fetcher = self.context.fetcher.clone();
            if let Some(abi) = fetcher
                .fetch_module_abi(module.address(), module.name(), self.context.settings.ledger_version)
                .await
                .map_err(ComposerError::Fetch)?
            {
                return Ok(abi);
            }
        }
        Err(ComposerError::MissingAbi {
            module: module.to_string(),
            fetch_disabled: !allow_fetch,
        })
    }

    /// Add one call to the script.
    ///
    /// Returns one [`CallArgument`] per declared return value of the called
    /// function, in declaration order. Modules registered before a failure
    /// stay registered.
    pub async fn add_batched_calls(&mut self, request: BatchedCallRequest) -> ComposerResult<Vec<CallArgument>> {
        let BatchedCallRequest {
            function,
            type_arguments,
            function_arguments,
            module_abi,
            module_bytecode,
            allow_fetch,
        } = request;

        let function_id: FunctionId = function
            .parse()
            .map_err(|e| ComposerError::invalid_input(format!("{:#}", e)))?;
        let target = function_id.module.clone();

        if !allow_fetch {
            if module_abi.is_none() {
                return Err(ComposerError::MissingAbi {
                    module: target.to_string(),
                    fetch_disabled: true,
                });
            }
            if module_bytecode.is_empty() {
                return Err(ComposerError::MissingBytecode {
                    module: target.to_string(),
                });
            }
        }
        if let Some(abi) = &module_abi {
            check_function_in_provided_abi(&function_id, abi)?;
        }

        for bytecode in module_bytecode {
            let id = module_identifier(&bytecode).map_err(|e| {
                ComposerError::configuration(format!("Cannot derive module ID from bytecode: {:#}", e))
            })?;
            let mut definition = ModuleDefinition::new(bytecode);
            if id == target {
                if let Some(abi) = &module_abi {
                    definition = definition.with_abi(abi.clone());
                }
            }
            self.store_module(definition, Some(id))?;
        }

        self.ensure_module(&target, allow_fetch).await?;

        let max_depth = self.context.settings.max_type_depth;
        let mut type_tags: Vec<TypeTag> = Vec::with_capacity(type_arguments.len());
        for type_arg in &type_arguments {
            let tag = parse_type_tag_with_depth(type_arg, max_depth).map_err(|e| {
                if e.downcast_ref::<TypeNestingError>().is_some() {
                    ComposerError::TypeNestingTooDeep {
                        type_tag: type_arg.trim().to_string(),
                        max_depth,
                    }
                } else {
                    ComposerError::invalid_input(format!("Invalid type argument '{}': {:#}", type_arg, e))
                }
            })?;
            for id in self.collect_required_modules(&tag, allow_fetch).await? {
                if self.pushed.contains(&id) {
                    continue;
                }
                let definition = self
                    .context
                    .cache
                    .get(&id)
                    .ok_or_else(|| ComposerError::missing_module(&id, "cached definition is unavailable"))?;
                self.push_module(&id, &definition)?;
            }
            type_tags.push(tag);
        }

        let abi = match module_abi {
            Some(abi) => abi,
            None => self.resolve_abi(&target, allow_fetch).await?,
        };
        let function_abi = validate_call(&function_id, &abi, &type_tags)?;
        let args = convert_arguments(&function_id, function_abi, function_arguments, &type_tags)?;

        let type_args: Vec<String> = type_tags.iter().map(format_type_tag).collect();
        let returns = self
            .engine
            .add_batched_call(&target, function_id.function_name(), &type_args, args)
            .map_err(ComposerError::Engine)?;
        debug!(
            function = %function_id,
            type_args = type_args.len(),
            returns = returns.len(),
            "added batched call"
        );
        Ok(returns)
    }

    /// Emit the script bytes for every call added so far.
    pub fn build(&mut self) -> ComposerResult<Vec<u8>> {
        self.engine.generate_bytecode(true).map_err(ComposerError::Engine)
    }

    /// [`build`](Self::build) wrapped in a script transaction payload.
    pub fn build_payload(&mut self) -> ComposerResult<TransactionPayload> {
        let bytes = self.build()?;
        let script = ScriptPayload::from_bcs(&bytes).map_err(ComposerError::Engine)?;
        Ok(TransactionPayload::Script(script))
    }
}

impl std::fmt::Debug for ComposerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposerSession")
            .field("pushed", &self.pushed_modules())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use composer_types::{GenericTypeParam, MoveFunctionAbi, Visibility};
    use serde_json::json;

    use crate::bytecode::{synthesize_module, ModuleShape};
    use crate::cache::ModuleCache;
    use crate::engine::CallPlan;
    use crate::fetcher::MockFetcher;

    fn function(name: &str, type_params: usize, params: &[&str], returns: &[&str]) -> MoveFunctionAbi {
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

    fn counter_abi() -> MoveModuleAbi {
        MoveModuleAbi {
            address: "0xcafe".to_string(),
            name: "counter".to_string(),
            friends: vec![],
            exposed_functions: vec![
                function("make", 0, &["u64"], &["u64"]),
                function("add", 0, &["u64", "u64"], &["u64"]),
                function("wrap", 1, &["u64"], &[]),
            ],
            structs: vec![],
        }
    }

    fn definition(abi: MoveModuleAbi) -> ModuleDefinition {
        let shape = ModuleShape::from_abi(&abi).unwrap();
        ModuleDefinition::new(synthesize_module(&shape).unwrap()).with_abi(abi)
    }

    fn plain_module(id: &str) -> ModuleDefinition {
        let shape = ModuleShape {
            id: id.parse().unwrap(),
            functions: BTreeMap::new(),
        };
        ModuleDefinition::new(synthesize_module(&shape).unwrap())
    }

    fn context_with(fetcher: Arc<MockFetcher>) -> ComposerContext {
        ComposerContext::new(Arc::new(ModuleCache::new()), fetcher.clone(), fetcher)
    }

    #[test]
    fn test_store_module_requires_id_or_abi() {
        let mut session = ComposerSession::new(ComposerContext::offline(Arc::new(ModuleCache::new())));
        let err = session
            .store_module(ModuleDefinition::new(vec![1, 2, 3]), None)
            .unwrap_err();
        assert!(matches!(err, ComposerError::Configuration { .. }));
        assert!(session.pushed_modules().is_empty());
    }

    #[test]
    fn test_store_module_derives_id_from_abi() {
        let cache = Arc::new(ModuleCache::new());
        let mut session = ComposerSession::new(ComposerContext::offline(cache.clone()));
        session.store_module(definition(counter_abi()), None).unwrap();
        session.store_module(definition(counter_abi()), None).unwrap();

        let id: ModuleIdentifier = "0xcafe::counter".parse().unwrap();
        assert!(session.is_pushed(&id));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_auto_fetch_and_thread_results() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.add_module("0xcafe::counter".parse().unwrap(), definition(counter_abi()));
        let mut session = ComposerSession::new(context_with(fetcher.clone()));

        let made = session
            .add_batched_calls(BatchedCallRequest::new("0xcafe::counter::make").argument(json!(5)))
            .await
            .unwrap();
        assert_eq!(made, vec![CallArgument::previous_result(0, 0)]);

        let summed = session
            .add_batched_calls(
                BatchedCallRequest::new("0xcafe::counter::add")
                    .argument(made[0].copy().unwrap())
                    .argument(json!("7")),
            )
            .await
            .unwrap();
        assert_eq!(summed, vec![CallArgument::previous_result(1, 0)]);
        assert_eq!(fetcher.module_fetch_count(), 1);

        let payload = session.build_payload().unwrap();
        let plan = CallPlan::from_script(payload.as_script()).unwrap();
        assert_eq!(plan.calls.len(), 2);
        assert_eq!(plan.calls[1].args[0], made[0].copy().unwrap());
        assert_eq!(plan.calls[1].args[1], CallArgument::new_bytes(7u64.to_le_bytes().to_vec()));
    }

    #[tokio::test]
    async fn test_manual_mode_preconditions() {
        let fetcher = Arc::new(MockFetcher::new());
        let mut session = ComposerSession::new(context_with(fetcher.clone()));

        let err = session
            .add_batched_calls(BatchedCallRequest::new("0xcafe::counter::make").allow_fetch(false))
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::MissingAbi { fetch_disabled: true, .. }));

        let err = session
            .add_batched_calls(
                BatchedCallRequest::new("0xcafe::counter::make")
                    .module_abi(counter_abi())
                    .allow_fetch(false),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::MissingBytecode { .. }));
        assert_eq!(fetcher.module_fetch_count() + fetcher.abi_fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_manual_mode_bytecode_for_other_module() {
        let fetcher = Arc::new(MockFetcher::new());
        let mut session = ComposerSession::new(context_with(fetcher.clone()));

        let err = session
            .add_batched_calls(
                BatchedCallRequest::new("0xcafe::counter::make")
                    .module_abi(counter_abi())
                    .module_bytecode(plain_module("0xcafe::other").bytecode)
                    .argument(json!(1))
                    .allow_fetch(false),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.module(),
            Some("0x000000000000000000000000000000000000000000000000000000000000cafe::counter")
        );
        assert!(matches!(err, ComposerError::MissingModule { .. }));
        // The unrelated module stays registered
        assert!(session.is_pushed(&"0xcafe::other".parse().unwrap()));
        assert_eq!(fetcher.module_fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_bytecode_is_configuration_error() {
        let mut session = ComposerSession::new(ComposerContext::offline(Arc::new(ModuleCache::new())));
        let err = session
            .add_batched_calls(
                BatchedCallRequest::new("0xcafe::counter::make")
                    .module_abi(counter_abi())
                    .module_bytecode(vec![0xde, 0xad])
                    .allow_fetch(false),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_verbatim() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.fail_with("503 Service Unavailable");
        let mut session = ComposerSession::new(context_with(fetcher));
        let err = session
            .add_batched_calls(BatchedCallRequest::new("0xcafe::counter::make").argument(json!(1)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "503 Service Unavailable");
    }

    #[tokio::test]
    async fn test_missing_on_chain() {
        let mut session = ComposerSession::new(context_with(Arc::new(MockFetcher::new())));
        let err = session
            .add_batched_calls(BatchedCallRequest::new("0xcafe::counter::make"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found on chain"));
    }

    #[tokio::test]
    async fn test_type_argument_modules_pushed_before_call() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.add_module("0xcafe::counter".parse().unwrap(), definition(counter_abi()));
        fetcher.add_module("0xcafe::token".parse().unwrap(), plain_module("0xcafe::token"));
        let mut session = ComposerSession::new(context_with(fetcher.clone()));

        session
            .add_batched_calls(
                BatchedCallRequest::new("0xcafe::counter::wrap")
                    .type_argument("vector<0xcafe::token::Token>")
                    .argument(json!(1)),
            )
            .await
            .unwrap();
        assert!(session.is_pushed(&"0xcafe::token".parse().unwrap()));
        assert_eq!(fetcher.module_fetch_count(), 2);
    }
}
