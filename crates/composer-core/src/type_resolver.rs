//! Type argument dependency resolution.
//!
//! Every struct named anywhere inside a type argument lives in a module the
//! engine must know before the call can be linked. For
//! `0x1::coin::Coin<vector<0xcafe::pool::Lp<0xbeef::token::T>>>` these are
//! `0x1::coin`, `0xcafe::pool` and `0xbeef::token`.

use std::collections::BTreeSet;

use composer_types::{format_type_tag, ModuleIdentifier};
use move_core_types::language_storage::TypeTag;
use tracing::trace;

use crate::error::{ComposerError, ComposerResult};
use crate::session::ComposerSession;

impl ComposerSession {
    /// Collect the modules declaring the structs inside `tag`.
    ///
    /// Modules missing from the cache are fetched and stored when
    /// `allow_fetch` is set. Otherwise the first missing module fails the
    /// resolution with a [`ComposerError::MissingModule`] naming it. Nesting
    /// deeper than the configured `max_type_depth` is rejected.
    pub async fn collect_required_modules(
        &mut self,
        tag: &TypeTag,
        allow_fetch: bool,
    ) -> ComposerResult<BTreeSet<ModuleIdentifier>> {
        let max_depth = self.context().settings.max_type_depth;
        let mut required = BTreeSet::new();
        let mut stack: Vec<(&TypeTag, usize)> = vec![(tag, 0)];

        while let Some((current, depth)) = stack.pop() {
            if depth > max_depth {
                return Err(ComposerError::TypeNestingTooDeep {
                    type_tag: format_type_tag(tag),
                    max_depth,
                });
            }
            match current {
                TypeTag::Vector(inner) => stack.push((inner.as_ref(), depth + 1)),
                TypeTag::Struct(struct_tag) => {
                    let id = ModuleIdentifier::from_struct_tag(struct_tag);
                    if required.insert(id.clone()) && !self.context().cache.contains(&id) {
                        if !allow_fetch {
                            return Err(ComposerError::missing_module(
                                &id,
                                "not cached and fetching is disabled",
                            ));
                        }
                        self.fetch_and_store(&id).await?;
                    }
                    // Reversed so type parameters are visited left to right
                    for param in struct_tag.type_params.iter().rev() {
                        stack.push((param, depth + 1));
                    }
                }
                _ => {}
            }
        }

        trace!(type_tag = %format_type_tag(tag), modules = required.len(), "resolved type argument modules");
        Ok(required)
    }
}
