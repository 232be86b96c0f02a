//! Structured errors for the composition engine.
//!
//! Every failure mode is reported through this one channel. Each variant
//! carries the class path it concerns plus a human-readable detail string,
//! and [`EngineError::kind`] exposes a stable machine-readable tag so
//! callers can format `{kind, path, detail}` without matching on variants.

use thiserror::Error;

/// Errors raised by definition, resolution, finalization, and instantiation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The same path was defined twice without the `replace` flag.
    #[error("Duplicate definition of '{path}'")]
    DuplicateDefinition {
        /// Path of the offending definition.
        path: String,
    },

    /// A hard dependency edge closed a cycle among pending classes.
    #[error("Cyclic dependency involving '{path}': {cycle}")]
    CyclicDependency {
        /// Path whose admission closed the cycle.
        path: String,
        /// The cycle, rendered as `a -> b -> a`.
        cycle: String,
    },

    /// A `requires` entry never finalized; surfaced on instantiation.
    #[error("Unresolved dependencies for '{path}': {missing}")]
    UnresolvedDependency {
        /// Path the caller tried to instantiate.
        path: String,
        /// Comma-separated list of unsatisfied hard dependencies.
        missing: String,
    },

    /// Neither a known path, alias, xtype, nor alternate class name.
    #[error("Unknown type '{name}'")]
    UnknownType {
        /// The name that failed to resolve.
        name: String,
    },

    /// Instantiation attempted against a node that has not finalized.
    #[error("Class '{path}' is not ready for instantiation")]
    NotReady {
        /// Path of the non-finalized node.
        path: String,
    },

    /// An alias was re-registered under a different path.
    #[error("Alias '{alias}' already registered for '{existing}', re-registered for '{path}'")]
    AliasConflict {
        /// The contested alias string.
        alias: String,
        /// Path that previously owned the alias.
        existing: String,
        /// Path that re-registered it (last writer, which wins).
        path: String,
    },

    /// Config mutation attempted on a destroyed instance.
    #[error("Instance of '{path}' is destroyed; cannot set '{key}'")]
    DestroyedInstance {
        /// Class path of the destroyed instance.
        path: String,
        /// Config key the caller tried to set.
        key: String,
    },

    /// A config setter's declared validator rejected the new value.
    #[error("Invalid value for config '{key}' on '{path}': {detail}")]
    InvalidConfigValue {
        /// Class path of the instance.
        path: String,
        /// Config key being set.
        key: String,
        /// Validator's rejection message.
        detail: String,
    },

    /// Config access on a key the class never declared.
    #[error("Config '{key}' is not declared on '{path}'")]
    UnknownConfig {
        /// Class path of the instance.
        path: String,
        /// The undeclared key.
        key: String,
    },

    /// Internal consistency violation (e.g. re-entrant finalization).
    #[error("Internal error for '{path}': {detail}")]
    Internal {
        /// Path of the node being processed.
        path: String,
        /// What went wrong.
        detail: String,
    },
}

impl EngineError {
    /// Stable machine-readable tag for this error's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::DuplicateDefinition { .. } => "DuplicateDefinition",
            EngineError::CyclicDependency { .. } => "CyclicDependency",
            EngineError::UnresolvedDependency { .. } => "UnresolvedDependency",
            EngineError::UnknownType { .. } => "UnknownType",
            EngineError::NotReady { .. } => "NotReady",
            EngineError::AliasConflict { .. } => "AliasConflict",
            EngineError::DestroyedInstance { .. } => "DestroyedInstance",
            EngineError::InvalidConfigValue { .. } => "InvalidConfigValue",
            EngineError::UnknownConfig { .. } => "UnknownConfig",
            EngineError::Internal { .. } => "Internal",
        }
    }

    /// The class path this error concerns, when one exists.
    pub fn path(&self) -> &str {
        match self {
            EngineError::DuplicateDefinition { path }
            | EngineError::CyclicDependency { path, .. }
            | EngineError::UnresolvedDependency { path, .. }
            | EngineError::NotReady { path }
            | EngineError::AliasConflict { path, .. }
            | EngineError::DestroyedInstance { path, .. }
            | EngineError::InvalidConfigValue { path, .. }
            | EngineError::UnknownConfig { path, .. }
            | EngineError::Internal { path, .. } => path,
            EngineError::UnknownType { name } => name,
        }
    }
}

/// Engine operation result.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        let err = EngineError::UnknownType {
            name: "widget.missing".to_string(),
        };
        assert_eq!(err.kind(), "UnknownType");
        assert_eq!(err.path(), "widget.missing");
    }

    #[test]
    fn test_display_carries_detail() {
        let err = EngineError::CyclicDependency {
            path: "A".to_string(),
            cycle: "A -> B -> A".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("A -> B -> A"));
    }
}
