//! Schema-driven configuration binding.
//!
//! This crate walks a declared configuration schema, pulls raw values from a
//! caller-populated [`RawStore`], fills unset keys from templated default
//! expressions that may reference other keys (in either direction), and
//! resolves the resulting reference graph by fixpoint iteration until every
//! key holds a concrete value or a deadlock is diagnosed.

pub mod binder;
pub mod decode;
pub mod error;
pub mod patch;
pub mod schema;
pub mod source;
pub mod store;
pub mod template;
pub mod tree;

pub use binder::Binder;
pub use decode::{ScalarTarget, fuzzy_decode};
pub use error::{BindError, BindResult};
pub use patch::{FieldTarget, Section, hydrate, set_key};
pub use schema::{FieldDescriptor, FieldKind, Schema};
pub use store::{MemoryStore, RawStore};
pub use template::{Functions, Outcome, Template};
pub use tree::Node;
