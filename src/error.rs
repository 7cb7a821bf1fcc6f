//! Structured error types for binding and key overrides.

use crate::schema::FieldKind;
use crate::template::{EvalError, ParseError};
use thiserror::Error;

/// Errors surfaced to the caller by [`Binder::bind`](crate::Binder::bind)
/// and the runtime override helpers in [`patch`](crate::patch).
///
/// All variants are fatal for the operation that produced them; the
/// retry-later signal of the template engine is not an error and never
/// appears here.
#[derive(Debug, Error)]
pub enum BindError {
    /// A key marked required has neither a raw value nor a default.
    #[error("required key missing: {path}{}", described(.description))]
    Required {
        path: String,
        description: Option<String>,
    },

    /// A full sweep over the pending defaults made no progress: the
    /// remaining keys reference each other in a cycle, or reference
    /// something that can never become available.
    #[error("mutual reference or unresolvable default: {}", .paths.join(", "))]
    MutualReference { paths: Vec<String> },

    /// A write disagreed with an earlier write about whether a path segment
    /// holds a scalar or a nested mapping.
    #[error("overlay hierarchical key: {path}")]
    OverlayHierarchicalKey { path: String },

    /// The default expression for a key is not a parseable template.
    #[error("invalid default expression for key {path}: {source}")]
    ExpressionSyntax {
        path: String,
        #[source]
        source: ParseError,
    },

    /// The default expression for a key failed during evaluation.
    #[error("failed to evaluate default expression for key {path}: {source}")]
    ExpressionRuntime {
        path: String,
        #[source]
        source: EvalError,
    },

    /// A path segment matched no field of the destination structure.
    #[error("unexpected key: {path}")]
    UnexpectedKey { path: String },

    /// A value could not be decoded into the destination field's kind.
    #[error("type does not match: kind {kind} and value {text:?}")]
    TypeMismatch { kind: FieldKind, text: String },
}

/// Result type for binding operations.
pub type BindResult<T> = std::result::Result<T, BindError>;

fn described(description: &Option<String>) -> String {
    match description {
        Some(text) => format!(" ({text})"),
        None => String::new(),
    }
}
