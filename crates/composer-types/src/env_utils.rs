//! Environment variable helpers for composer configuration.
//!
//! Configuration knobs (node URL, HTTP timeouts, type nesting bound) can be
//! overridden through `COMPOSER_*` variables. A variable that is set but does
//! not parse is an error rather than a silent fallback:
//!
//! ```
//! use composer_types::env_utils::{env_var, env_var_or};
//!
//! let timeout: u64 = env_var_or("COMPOSER_DOC_TIMEOUT_SECS", 30).unwrap();
//! assert_eq!(timeout, 30);
//!
//! let url: Option<String> = env_var("COMPOSER_DOC_NODE_URL").unwrap();
//! assert!(url.is_none());
//! ```

use std::fmt::Display;
use std::str::FromStr;

use anyhow::{anyhow, Result};

/// Read and parse an environment variable.
///
/// Unset and blank variables yield `Ok(None)`.
pub fn env_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env_string(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("Invalid value '{}' for {}: {}", raw, key, e)),
        None => Ok(None),
    }
}

/// Read and parse an environment variable, falling back to `default` when unset.
pub fn env_var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(env_var(key)?.unwrap_or(default))
}

/// Trimmed, non-empty value of an environment variable.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
