//! Custom assertion utilities for tests.

use composer_core::ComposerError;
use composer_types::ModuleIdentifier;

/// Assert that a result is Ok and return the inner value.
#[allow(dead_code)]
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{} failed: {:?}", context, e),
    }
}

/// Assert that an error message contains expected text, ignoring case.
#[allow(dead_code)]
pub fn assert_error_contains<E: std::fmt::Display>(error: E, expected_text: &str, context: &str) {
    let error_str = error.to_string().to_lowercase();
    assert!(
        error_str.contains(&expected_text.to_lowercase()),
        "{}: error message should contain '{}', got: {}",
        context,
        expected_text,
        error
    );
}

/// Assert that `error` is a missing-module error naming exactly `expected`.
#[allow(dead_code)]
pub fn assert_missing_module(error: &ComposerError, expected: &ModuleIdentifier) {
    match error {
        ComposerError::MissingModule { module, .. } => assert_eq!(
            module,
            &expected.to_string(),
            "missing module error names the wrong module"
        ),
        other => panic!("expected MissingModule for {}, got: {}", expected, other),
    }
}

/// Assert an arity mismatch with the given counts.
#[allow(dead_code)]
pub fn assert_arity_mismatch(error: &ComposerError, expected_count: usize, received_count: usize) {
    match error {
        ComposerError::TypeArityMismatch {
            expected, received, ..
        } => {
            assert_eq!(*expected, expected_count, "expected type argument count");
            assert_eq!(*received, received_count, "received type argument count");
        }
        other => panic!("expected TypeArityMismatch, got: {}", other),
    }
}
