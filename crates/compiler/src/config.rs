//! Compiler configuration for extensibility
//!
//! Lets a caller override the eight error-stub names (e.g. to link
//! against a runtime that prefixes its symbols) without touching the
//! compiler internals.
//!
//! # Example
//!
//! ```
//! use fdlc::config::CodegenConfig;
//! use fdl_core::ErrorKind;
//!
//! let config = CodegenConfig::new()
//!     .with_error_label(ErrorKind::ArithOverflow, "myrt_overflow")
//!     .unwrap();
//! assert_eq!(config.error_label(ErrorKind::ArithOverflow).0, "myrt_overflow");
//! assert_eq!(config.error_label(ErrorKind::Arity).0, "error_arity");
//! ```

use fdl_core::{ErrorKind, Label};
use std::collections::HashMap;

/// Validate that a symbol name is safe to emit as a jump target.
///
/// Valid symbols contain only alphanumeric characters and underscores,
/// enough to keep an injected label from smuggling in assembler
/// directives through a configured name.
fn validate_symbol(symbol: &str) -> Result<(), String> {
    if symbol.is_empty() {
        return Err("error-stub symbol cannot be empty".to_string());
    }
    for c in symbol.chars() {
        if !c.is_alphanumeric() && c != '_' {
            return Err(format!(
                "invalid character '{c}' in error-stub symbol '{symbol}': \
                 only alphanumeric characters and underscores are allowed"
            ));
        }
    }
    Ok(())
}

/// Configuration for the code generator.
#[derive(Debug, Clone, Default)]
pub struct CodegenConfig {
    error_label_overrides: HashMap<ErrorKind, String>,
}

impl CodegenConfig {
    pub fn new() -> Self {
        CodegenConfig::default()
    }

    /// Override the label emitted for `kind`'s error stub.
    pub fn with_error_label(
        mut self,
        kind: ErrorKind,
        name: impl Into<String>,
    ) -> Result<Self, String> {
        let name = name.into();
        validate_symbol(&name)?;
        self.error_label_overrides.insert(kind, name);
        Ok(self)
    }

    /// The label to jump to for `kind`: the configured override, or
    /// the default error-stub name.
    pub fn error_label(&self, kind: ErrorKind) -> Label {
        match self.error_label_overrides.get(&kind) {
            Some(name) => Label(name.clone()),
            None => kind.label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_names() {
        let config = CodegenConfig::new();
        assert_eq!(config.error_label(ErrorKind::NonNumber).0, "error_non_number");
    }

    #[test]
    fn override_replaces_only_the_requested_kind() {
        let config = CodegenConfig::new()
            .with_error_label(ErrorKind::Arity, "rt_arity")
            .unwrap();
        assert_eq!(config.error_label(ErrorKind::Arity).0, "rt_arity");
        assert_eq!(config.error_label(ErrorKind::NonTuple).0, "error_non_tuple");
    }

    #[test]
    fn rejects_symbols_with_invalid_characters() {
        assert!(CodegenConfig::new().with_error_label(ErrorKind::Arity, "bad-name").is_err());
        assert!(CodegenConfig::new().with_error_label(ErrorKind::Arity, "").is_err());
    }
}
