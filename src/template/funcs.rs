//! Filter registry and builtin filters.
//!
//! Filters are plain function pointers so the set stays pluggable: the
//! binder ships with [`Functions::builtin`], callers can register their
//! own alongside or start from [`Functions::empty`].

use std::collections::BTreeMap;
use thiserror::Error;

/// A value flowing through a filter pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    List(Vec<String>),
}

/// A literal filter argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Text(String),
    Number(i64),
}

/// Error raised by a filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The input cannot produce a value yet (e.g. a positional index past
    /// the end of a list). Treated as a retryable absence, not a failure.
    #[error("no value")]
    Unresolved,

    /// The filter's input or arguments are invalid. Fatal.
    #[error("{0}")]
    Invalid(String),
}

/// Signature of a filter: transform the piped value using literal args.
pub type FilterFn = fn(Value, &[Arg]) -> Result<Value, FilterError>;

/// Named filter registry.
#[derive(Debug, Clone)]
pub struct Functions {
    filters: BTreeMap<String, FilterFn>,
}

impl Default for Functions {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Functions {
    /// A registry with no filters.
    pub fn empty() -> Self {
        Self { filters: BTreeMap::new() }
    }

    /// The builtin filter set: `split`, `index`, `first`, `last`, `trim`,
    /// `upper`, `lower`, `replace`.
    pub fn builtin() -> Self {
        let mut functions = Self::empty();
        functions.register("split", split);
        functions.register("index", index);
        functions.register("first", first);
        functions.register("last", last);
        functions.register("trim", trim);
        functions.register("upper", upper);
        functions.register("lower", lower);
        functions.register("replace", replace);
        functions
    }

    /// Register a filter, replacing any existing one of the same name.
    pub fn register(&mut self, name: impl Into<String>, filter: FilterFn) {
        self.filters.insert(name.into(), filter);
    }

    pub fn get(&self, name: &str) -> Option<FilterFn> {
        self.filters.get(name).copied()
    }

    /// Registered filter names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(|k| k.as_str())
    }
}

fn expect_text(value: Value) -> Result<String, FilterError> {
    match value {
        Value::Text(text) => Ok(text),
        Value::List(_) => Err(FilterError::Invalid("expected text, got a list".to_string())),
    }
}

fn expect_list(value: Value) -> Result<Vec<String>, FilterError> {
    match value {
        Value::List(items) => Ok(items),
        Value::Text(_) => Err(FilterError::Invalid("expected a list, got text".to_string())),
    }
}

fn text_arg<'a>(args: &'a [Arg], position: usize) -> Result<&'a str, FilterError> {
    match args.get(position) {
        Some(Arg::Text(text)) => Ok(text),
        Some(Arg::Number(_)) => Err(FilterError::Invalid(format!(
            "argument {} must be a string",
            position + 1
        ))),
        None => Err(FilterError::Invalid(format!("missing argument {}", position + 1))),
    }
}

fn number_arg(args: &[Arg], position: usize) -> Result<i64, FilterError> {
    match args.get(position) {
        Some(Arg::Number(number)) => Ok(*number),
        Some(Arg::Text(_)) => Err(FilterError::Invalid(format!(
            "argument {} must be a number",
            position + 1
        ))),
        None => Err(FilterError::Invalid(format!("missing argument {}", position + 1))),
    }
}

fn exactly(args: &[Arg], count: usize) -> Result<(), FilterError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(FilterError::Invalid(format!(
            "expected {} argument(s), got {}",
            count,
            args.len()
        )))
    }
}

/// `split SEP`: divide text on a non-empty separator.
fn split(value: Value, args: &[Arg]) -> Result<Value, FilterError> {
    exactly(args, 1)?;
    let separator = text_arg(args, 0)?;
    if separator.is_empty() {
        return Err(FilterError::Invalid("separator must not be empty".to_string()));
    }
    let text = expect_text(value)?;
    Ok(Value::List(text.split(separator).map(str::to_string).collect()))
}

/// `index N`: pick the 0-based Nth list element. Past-the-end indexes are
/// a retryable absence, not an error.
fn index(value: Value, args: &[Arg]) -> Result<Value, FilterError> {
    exactly(args, 1)?;
    let position = number_arg(args, 0)?;
    if position < 0 {
        return Err(FilterError::Invalid("index must be non-negative".to_string()));
    }
    let items = expect_list(value)?;
    match items.into_iter().nth(position as usize) {
        Some(item) => Ok(Value::Text(item)),
        None => Err(FilterError::Unresolved),
    }
}

fn first(value: Value, args: &[Arg]) -> Result<Value, FilterError> {
    exactly(args, 0)?;
    let mut items = expect_list(value)?;
    if items.is_empty() {
        return Err(FilterError::Unresolved);
    }
    Ok(Value::Text(items.remove(0)))
}

fn last(value: Value, args: &[Arg]) -> Result<Value, FilterError> {
    exactly(args, 0)?;
    let mut items = expect_list(value)?;
    match items.pop() {
        Some(item) => Ok(Value::Text(item)),
        None => Err(FilterError::Unresolved),
    }
}

fn trim(value: Value, args: &[Arg]) -> Result<Value, FilterError> {
    exactly(args, 0)?;
    let text = expect_text(value)?;
    Ok(Value::Text(text.trim().to_string()))
}

fn upper(value: Value, args: &[Arg]) -> Result<Value, FilterError> {
    exactly(args, 0)?;
    let text = expect_text(value)?;
    Ok(Value::Text(text.to_uppercase()))
}

fn lower(value: Value, args: &[Arg]) -> Result<Value, FilterError> {
    exactly(args, 0)?;
    let text = expect_text(value)?;
    Ok(Value::Text(text.to_lowercase()))
}

/// `replace FROM TO`: substitute every occurrence of FROM with TO.
fn replace(value: Value, args: &[Arg]) -> Result<Value, FilterError> {
    exactly(args, 2)?;
    let from = text_arg(args, 0)?;
    if from.is_empty() {
        return Err(FilterError::Invalid("search text must not be empty".to_string()));
    }
    let to = text_arg(args, 1)?.to_string();
    let text = expect_text(value)?;
    Ok(Value::Text(text.replace(from, &to)))
}
