//! Composer error types.
//!
//! Every failure of `store_module`, `add_batched_calls`, `build` and
//! transaction assembly surfaces as a [`ComposerError`]. Messages name the
//! offending module or function so a request can be fixed without reading the
//! code that rejected it.

use std::fmt;

/// Structured errors raised by a composer session.
#[derive(Debug)]
pub enum ComposerError {
    /// A module identifier could not be derived (no explicit id, no usable ABI,
    /// undecodable bytecode).
    Configuration { message: String },

    /// Malformed request input (function id, type argument string).
    InvalidInput { message: String },

    /// A required module is neither cached nor fetchable under the active policy.
    MissingModule {
        /// Canonical `address::module` string
        module: String,
        reason: String,
    },

    /// No ABI to validate against.
    MissingAbi {
        module: String,
        /// True when the ABI was mandatory because fetching is disabled
        fetch_disabled: bool,
    },

    /// Fetching is disabled and no module bytecode was supplied.
    MissingBytecode { module: String },

    FunctionNotFound {
        module: String,
        function: String,
        /// True when the lookup ran against a caller-supplied ABI before any fetch
        in_provided_abi: bool,
    },

    TypeArityMismatch {
        function: String,
        expected: usize,
        received: usize,
    },

    /// A type argument nests deeper than the configured bound.
    TypeNestingTooDeep { type_tag: String, max_depth: usize },

    /// A concrete argument could not be encoded against its ABI parameter type.
    InvalidArgument {
        function: String,
        index: usize,
        expected_type: String,
        reason: String,
    },

    /// The composer engine rejected an operation.
    Engine(anyhow::Error),

    /// Failure reported by a network collaborator; displayed verbatim.
    Fetch(anyhow::Error),
}

pub type ComposerResult<T> = std::result::Result<T, ComposerError>;

impl ComposerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ComposerError::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ComposerError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn missing_module(module: impl ToString, reason: impl Into<String>) -> Self {
        ComposerError::MissingModule {
            module: module.to_string(),
            reason: reason.into(),
        }
    }

    /// The module this error is about, if it names one.
    pub fn module(&self) -> Option<&str> {
        match self {
            ComposerError::MissingModule { module, .. }
            | ComposerError::MissingAbi { module, .. }
            | ComposerError::MissingBytecode { module }
            | ComposerError::FunctionNotFound { module, .. } => Some(module),
            _ => None,
        }
    }
}

impl fmt::Display for ComposerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposerError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            ComposerError::InvalidInput { message } => write!(f, "Invalid input: {}", message),
            ComposerError::MissingModule { module, reason } => {
                write!(f, "Module '{}' is not available: {}", module, reason)
            }
            ComposerError::MissingAbi {
                module,
                fetch_disabled,
            } => {
                if *fetch_disabled {
                    write!(
                        f,
                        "Module ABI is required when auto-fetch is disabled for '{}'",
                        module
                    )
                } else {
                    write!(f, "Could not find module ABI for '{}'", module)
                }
            }
            ComposerError::MissingBytecode { module } => write!(
                f,
                "Module bytecode is required when auto-fetch is disabled for '{}'",
                module
            ),
            ComposerError::FunctionNotFound {
                module,
                function,
                in_provided_abi,
            } => {
                if *in_provided_abi {
                    write!(
                        f,
                        "Function '{}' not found in provided ABI for module '{}'",
                        function, module
                    )
                } else {
                    write!(f, "Could not find function ABI for '{}::{}'", module, function)
                }
            }
            ComposerError::TypeArityMismatch {
                function,
                expected,
                received,
            } => write!(
                f,
                "Type argument count mismatch for '{}', expected {}, received {}",
                function, expected, received
            ),
            ComposerError::TypeNestingTooDeep {
                type_tag,
                max_depth,
            } => write!(
                f,
                "Type '{}' exceeds the maximum nesting depth of {}",
                type_tag, max_depth
            ),
            ComposerError::InvalidArgument {
                function,
                index,
                expected_type,
                reason,
            } => write!(
                f,
                "Invalid argument {} for '{}' (expected {}): {}",
                index, function, expected_type, reason
            ),
            ComposerError::Engine(e) => write!(f, "Composer engine error: {}", e),
            ComposerError::Fetch(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ComposerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ComposerError::Engine(e) | ComposerError::Fetch(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}
