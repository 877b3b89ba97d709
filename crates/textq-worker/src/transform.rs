//! Text transforms.
//!
//! A transform is a pure `(text) -> text` function. The worker runs it on
//! the blocking pool under a deadline, so implementations may be CPU bound
//! but must not depend on queue or store state.

use std::sync::Arc;

use thiserror::Error;

/// Error returned by a transform that rejects its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// The processing step applied to every job.
pub trait Transform: Send + Sync + 'static {
    /// Short name used in logs and metrics labels.
    fn name(&self) -> &str;

    /// Transform `text`. Must be deterministic.
    fn apply(&self, text: &str) -> Result<String, TransformError>;
}

/// Uppercases the text. The default transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uppercase;

impl Transform for Uppercase {
    fn name(&self) -> &str {
        "uppercase"
    }

    fn apply(&self, text: &str) -> Result<String, TransformError> {
        Ok(text.to_uppercase())
    }
}

/// Lowercases the text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lowercase;

impl Transform for Lowercase {
    fn name(&self) -> &str {
        "lowercase"
    }

    fn apply(&self, text: &str) -> Result<String, TransformError> {
        Ok(text.to_lowercase())
    }
}

/// Reverses the text by characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reverse;

impl Transform for Reverse {
    fn name(&self) -> &str {
        "reverse"
    }

    fn apply(&self, text: &str) -> Result<String, TransformError> {
        Ok(text.chars().rev().collect())
    }
}

/// Look up a built-in transform by name.
pub fn by_name(name: &str) -> Option<Arc<dyn Transform>> {
    match name.to_lowercase().as_str() {
        "uppercase" | "upper" => Some(Arc::new(Uppercase)),
        "lowercase" | "lower" => Some(Arc::new(Lowercase)),
        "reverse" => Some(Arc::new(Reverse)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase() {
        assert_eq!(Uppercase.apply("hello").unwrap(), "HELLO");
        assert_eq!(Uppercase.apply("straße").unwrap(), "STRASSE");
        assert_eq!(Uppercase.apply("").unwrap(), "");
    }

    #[test]
    fn test_reverse_keeps_characters() {
        assert_eq!(Reverse.apply("añb").unwrap(), "bña");
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("UPPER").map(|t| t.name().to_string()).as_deref(), Some("uppercase"));
        assert_eq!(by_name("lowercase").unwrap().apply("ABC").unwrap(), "abc");
        assert!(by_name("rot13").is_none());
    }
}
