//! Configuration schema description.
//!
//! A schema is a statically built tree of [`FieldDescriptor`]s: each leaf
//! declares a typed key, each `Nested` field contributes a path segment and
//! carries its own children. Schemas can be assembled in code with the
//! builder methods or declared in YAML and deserialized.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Segment delimiter for fully qualified key paths.
pub const PATH_DELIMITER: char = '.';

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    Bool,
    #[default]
    Text,
    /// A nested section; the field's `children` carry its sub-fields.
    Nested,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::I8 => "i8",
            FieldKind::I16 => "i16",
            FieldKind::I32 => "i32",
            FieldKind::I64 => "i64",
            FieldKind::Isize => "isize",
            FieldKind::U8 => "u8",
            FieldKind::U16 => "u16",
            FieldKind::U32 => "u32",
            FieldKind::U64 => "u64",
            FieldKind::Usize => "usize",
            FieldKind::Bool => "bool",
            FieldKind::Text => "text",
            FieldKind::Nested => "nested",
        };
        write!(f, "{}", name)
    }
}

/// Declaration of a single configuration field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name; becomes one segment of the dotted key path.
    pub name: String,

    /// Value kind for this field (default: text).
    #[serde(default)]
    pub kind: FieldKind,

    /// Sub-fields; only meaningful when `kind` is `Nested`.
    #[serde(default)]
    pub children: Vec<FieldDescriptor>,

    /// Template expression that produces the value when no raw value is
    /// supplied. May reference other keys, including other defaulted keys.
    #[serde(default)]
    pub default: Option<String>,

    /// Whether binding fails when the key has no raw value and no default.
    #[serde(default)]
    pub required: bool,

    /// Whether the key is left absent (instead of bound to an empty string)
    /// when it has no raw value, no default, and is not required.
    #[serde(default)]
    pub omit_empty: bool,

    /// Human-readable description, echoed in required-key errors.
    #[serde(default)]
    pub description: Option<String>,
}

impl FieldDescriptor {
    /// Create a scalar leaf field of the given kind.
    pub fn scalar(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: Vec::new(),
            default: None,
            required: false,
            omit_empty: false,
            description: None,
        }
    }

    /// Create a text leaf field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::scalar(name, FieldKind::Text)
    }

    /// Create a nested section with the given children.
    pub fn nested(name: impl Into<String>, children: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Nested,
            children,
            default: None,
            required: false,
            omit_empty: false,
            description: None,
        }
    }

    /// Attach a default expression.
    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    /// Mark the field required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Leave the field absent instead of binding an empty string.
    pub fn omit_empty(mut self) -> Self {
        self.omit_empty = true;
        self
    }

    /// Attach a description.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// A scalar leaf produced by the schema walker.
#[derive(Debug, Clone)]
pub struct LeafField<'a> {
    /// Fully qualified dotted key path.
    pub path: String,
    /// The leaf's descriptor.
    pub field: &'a FieldDescriptor,
}

/// An ordered set of root fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    pub fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { fields }
    }

    /// Parse a schema from a YAML list of field declarations.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let schema: Schema = serde_yaml::from_str(text)?;
        Ok(schema)
    }

    /// Depth-first traversal of the schema, producing every scalar leaf
    /// with its fully qualified dotted path. Pure; no side effects.
    pub fn leaves(&self) -> Vec<LeafField<'_>> {
        let mut out = Vec::new();
        collect_leaves(&self.fields, "", &mut out);
        out
    }

    /// Check structural invariants the binder relies on.
    ///
    /// Rejects empty names, names containing the path delimiter, duplicate
    /// sibling names, `Nested` fields without children or carrying
    /// leaf-only markers, non-`Nested` fields with children, and fields
    /// declaring both `required` and a default expression.
    pub fn validate(&self) -> Result<()> {
        validate_level(&self.fields, "")
    }
}

fn collect_leaves<'a>(fields: &'a [FieldDescriptor], prefix: &str, out: &mut Vec<LeafField<'a>>) {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}{}{}", prefix, PATH_DELIMITER, field.name)
        };
        if field.kind == FieldKind::Nested {
            collect_leaves(&field.children, &path, out);
        } else {
            out.push(LeafField { path, field });
        }
    }
}

fn validate_level(fields: &[FieldDescriptor], prefix: &str) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}{}{}", prefix, PATH_DELIMITER, field.name)
        };

        if field.name.is_empty() {
            return Err(anyhow!("field under {:?} has an empty name", prefix));
        }
        if field.name.contains(PATH_DELIMITER) {
            return Err(anyhow!(
                "field name {:?} contains the path delimiter {:?}",
                field.name,
                PATH_DELIMITER
            ));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(anyhow!("duplicate field name at {:?}", path));
        }

        if field.kind == FieldKind::Nested {
            if field.children.is_empty() {
                return Err(anyhow!("nested field {:?} has no children", path));
            }
            if field.default.is_some() || field.required || field.omit_empty {
                return Err(anyhow!(
                    "nested field {:?} cannot carry default, required, or omit_empty",
                    path
                ));
            }
            validate_level(&field.children, &path)?;
        } else {
            if !field.children.is_empty() {
                return Err(anyhow!("scalar field {:?} cannot have children", path));
            }
            if field.required && field.default.is_some() {
                return Err(anyhow!(
                    "field {:?} declares both required and a default expression",
                    path
                ));
            }
        }
    }
    Ok(())
}
