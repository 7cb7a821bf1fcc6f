//! Template evaluation against a value tree.

use super::funcs::{FilterError, Functions, Value};
use super::parser::{Expr, Segment};
use crate::tree::Node;
use thiserror::Error;

/// The outcome of rendering a template.
///
/// `NotReady` is the explicit retry signal: the template references
/// something the context does not hold yet. It is never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ready(String),
    NotReady,
}

/// Fatal evaluation errors. Retryable absences are reported through
/// [`Outcome::NotReady`] instead.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unknown filter {name:?}")]
    UnknownFilter { name: String },

    #[error("filter {name:?}: {message}")]
    Filter { name: String, message: String },

    /// The referenced path names a mapping, which has no single value. The
    /// shape cannot change later, so this is not retried.
    #[error("{path:?} names a whole section, not a single value")]
    SectionValue { path: String },

    /// The referenced path descends through an existing scalar. The shape
    /// cannot change later, so this is not retried.
    #[error("{path:?} descends through a scalar value")]
    ScalarTraversal { path: String },

    #[error("a list must be reduced to a single item before substitution")]
    ListSubstitution,
}

enum Interrupt {
    NotReady,
    Fatal(EvalError),
}

impl From<EvalError> for Interrupt {
    fn from(err: EvalError) -> Self {
        Interrupt::Fatal(err)
    }
}

pub(crate) fn render(
    segments: &[Segment],
    context: &Node,
    functions: &Functions,
) -> Result<Outcome, EvalError> {
    let mut out = String::new();
    match eval_segments(segments, context, functions, &mut out) {
        Ok(()) => Ok(Outcome::Ready(out)),
        Err(Interrupt::NotReady) => Ok(Outcome::NotReady),
        Err(Interrupt::Fatal(err)) => Err(err),
    }
}

fn eval_segments(
    segments: &[Segment],
    context: &Node,
    functions: &Functions,
    out: &mut String,
) -> Result<(), Interrupt> {
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Expr(expr) => match eval_expr(expr, context, functions)? {
                Value::Text(text) => out.push_str(&text),
                Value::List(_) => return Err(EvalError::ListSubstitution.into()),
            },
            Segment::Cond(cond) => {
                // An absent or not-yet-resolvable guard suppresses the
                // then-branch; it does not defer or fail the template.
                let take_then = match eval_expr(&cond.guard, context, functions) {
                    Ok(value) => truthy(&value),
                    Err(Interrupt::NotReady) => false,
                    Err(fatal) => return Err(fatal),
                };
                let body = if take_then { &cond.then_body } else { &cond.else_body };
                eval_segments(body, context, functions, out)?;
            }
        }
    }
    Ok(())
}

fn eval_expr(expr: &Expr, context: &Node, functions: &Functions) -> Result<Value, Interrupt> {
    let mut value = lookup(context, &expr.path)?;
    for call in &expr.filters {
        let Some(filter) = functions.get(&call.name) else {
            return Err(EvalError::UnknownFilter { name: call.name.clone() }.into());
        };
        value = filter(value, &call.args).map_err(|err| match err {
            FilterError::Unresolved => Interrupt::NotReady,
            FilterError::Invalid(message) => Interrupt::Fatal(EvalError::Filter {
                name: call.name.clone(),
                message,
            }),
        })?;
    }
    Ok(value)
}

fn lookup(context: &Node, path: &[String]) -> Result<Value, Interrupt> {
    let mut current = context;
    for part in path {
        match current {
            Node::Mapping(map) => match map.get(part) {
                Some(node) => current = node,
                None => return Err(Interrupt::NotReady),
            },
            Node::Scalar(_) => {
                return Err(EvalError::ScalarTraversal { path: path.join(".") }.into());
            }
        }
    }
    match current {
        Node::Scalar(text) => Ok(Value::Text(text.clone())),
        Node::Mapping(_) => Err(EvalError::SectionValue { path: path.join(".") }.into()),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Text(text) => !text.is_empty(),
        Value::List(items) => !items.is_empty(),
    }
}
