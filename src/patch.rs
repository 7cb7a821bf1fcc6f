//! Runtime key overrides into typed configuration structures.
//!
//! [`Section`] is the visitor seam a typed configuration tree implements
//! so individual dotted keys can be patched after loading (and so a whole
//! resolved tree can be replayed into it with [`hydrate`]). Descent is
//! driven by the structure itself; there is no runtime type introspection.

use crate::decode::{ScalarTarget, fuzzy_decode};
use crate::error::{BindError, BindResult};
use crate::schema::{PATH_DELIMITER, Schema};
use crate::tree::Node;

/// What a structure exposes for one of its field names.
pub enum FieldTarget<'a> {
    /// A scalar slot, decoded with [`fuzzy_decode`].
    Value(ScalarTarget<'a>),
    /// A nested section to descend into.
    Section(&'a mut dyn Section),
}

/// A typed configuration node that can hand out mutable access to its
/// fields by name.
pub trait Section {
    fn field_mut(&mut self, name: &str) -> Option<FieldTarget<'_>>;
}

/// Decode `value` into the field addressed by the dotted `path`.
///
/// Fails with `UnexpectedKey` when a segment matches no field (or when
/// segments remain below a scalar), and with `TypeMismatch` when the
/// terminal field rejects the value, including a terminal that is itself
/// a section, which has no scalar representation.
pub fn set_key(root: &mut dyn Section, path: &str, value: &str) -> BindResult<()> {
    let parts: Vec<&str> = path.split(PATH_DELIMITER).collect();
    let mut current: &mut dyn Section = root;

    for (position, part) in parts.iter().enumerate() {
        let terminal = position + 1 == parts.len();
        match current.field_mut(part) {
            None => return Err(BindError::UnexpectedKey { path: path.to_string() }),
            Some(FieldTarget::Value(target)) => {
                if !terminal {
                    return Err(BindError::UnexpectedKey { path: path.to_string() });
                }
                let kind = target.kind();
                if !fuzzy_decode(target, value) {
                    return Err(BindError::TypeMismatch { kind, text: value.to_string() });
                }
                return Ok(());
            }
            Some(FieldTarget::Section(next)) => {
                if terminal {
                    return Err(BindError::TypeMismatch {
                        kind: crate::schema::FieldKind::Nested,
                        text: value.to_string(),
                    });
                }
                current = next;
            }
        }
    }

    // Unreachable: the loop always returns on the terminal segment.
    Err(BindError::UnexpectedKey { path: path.to_string() })
}

/// Replay every resolved scalar leaf of `tree` into a typed structure.
///
/// Leaves absent from the tree (omit-empty keys) are skipped.
pub fn hydrate(root: &mut dyn Section, schema: &Schema, tree: &Node) -> BindResult<()> {
    for leaf in schema.leaves() {
        if let Some(text) = tree.scalar_at(&leaf.path) {
            set_key(root, &leaf.path, text)?;
        }
    }
    Ok(())
}
