//! The binding engine: seed pass plus fixpoint resolution of defaults.

use crate::error::{BindError, BindResult};
use crate::schema::Schema;
use crate::store::RawStore;
use crate::template::{Functions, Outcome, Template};
use crate::tree::Node;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Binds a schema against a raw value store.
///
/// One binder performs one [`bind`](Binder::bind): the call consumes the
/// binder and returns the resolved value tree, so no resolution state can
/// leak across invocations. Resolved defaults are written back into the
/// store, making them visible to later lookups under the same key.
pub struct Binder<'s, S: RawStore> {
    store: &'s mut S,
    functions: Functions,
    pending: BTreeMap<String, Template>,
    resolved: Node,
}

impl<'s, S: RawStore> Binder<'s, S> {
    /// Create a binder with the builtin filter set.
    pub fn new(store: &'s mut S) -> Self {
        Self::with_functions(store, Functions::builtin())
    }

    /// Create a binder with a caller-supplied filter registry.
    pub fn with_functions(store: &'s mut S, functions: Functions) -> Self {
        Self {
            store,
            functions,
            pending: BTreeMap::new(),
            resolved: Node::mapping(),
        }
    }

    /// Resolve every leaf of the schema to a concrete value (or a
    /// deliberate absence, for omit-empty leaves) and return the tree.
    ///
    /// Defaults may reference other keys in either schema order; entries
    /// that cannot be evaluated yet are retried in sorted sweeps until all
    /// resolve or a sweep makes no progress, which is diagnosed as a
    /// mutual reference naming every unresolved key.
    pub fn bind(mut self, schema: &Schema) -> BindResult<Node> {
        self.seed(schema)?;

        while !self.pending.is_empty() {
            let mut progress = false;
            let keys: Vec<String> = self.pending.keys().cloned().collect();
            for key in keys {
                let Some(template) = self.pending.remove(&key) else {
                    continue;
                };
                match template.render(&self.resolved, &self.functions) {
                    Ok(Outcome::Ready(text)) => {
                        self.commit(&key, text)?;
                        progress = true;
                    }
                    Ok(Outcome::NotReady) => {
                        debug!("default for {} not yet resolvable; keeping pending", key);
                        self.pending.insert(key, template);
                    }
                    Err(err) => {
                        return Err(BindError::ExpressionRuntime { path: key, source: err });
                    }
                }
            }

            if !progress {
                let paths: Vec<String> = self.pending.keys().cloned().collect();
                warn!("no default resolved in a full sweep: {}", paths.join(", "));
                return Err(BindError::MutualReference { paths });
            }
        }

        Ok(self.resolved)
    }

    /// First pass over the schema leaves, in walker order.
    ///
    /// Raw values win outright. Defaults are attempted immediately so a
    /// reference to an already-seeded key never enters the pending set;
    /// only genuinely forward or mutual references are deferred.
    fn seed(&mut self, schema: &Schema) -> BindResult<()> {
        for leaf in schema.leaves() {
            if let Some(value) = self.store.get(&leaf.path) {
                self.write_resolved(&leaf.path, value)?;
                continue;
            }

            if let Some(expr) = &leaf.field.default {
                let template = Template::parse(expr).map_err(|err| BindError::ExpressionSyntax {
                    path: leaf.path.clone(),
                    source: err,
                })?;
                match template.render(&self.resolved, &self.functions) {
                    Ok(Outcome::Ready(text)) => self.commit(&leaf.path, text)?,
                    Ok(Outcome::NotReady) => {
                        debug!("deferring default for {}", leaf.path);
                        self.pending.insert(leaf.path, template);
                    }
                    Err(err) => {
                        return Err(BindError::ExpressionRuntime {
                            path: leaf.path,
                            source: err,
                        });
                    }
                }
                continue;
            }

            if leaf.field.required {
                return Err(BindError::Required {
                    path: leaf.path,
                    description: leaf.field.description.clone(),
                });
            }

            if !leaf.field.omit_empty {
                self.commit(&leaf.path, String::new())?;
            }
        }
        Ok(())
    }

    /// Make a resolved value visible to both the store and the tree.
    fn commit(&mut self, path: &str, value: String) -> BindResult<()> {
        self.store.set(path, value.clone());
        self.write_resolved(path, value)
    }

    fn write_resolved(&mut self, path: &str, value: String) -> BindResult<()> {
        self.resolved
            .set(path, value)
            .map_err(|err| BindError::OverlayHierarchicalKey { path: err.path })
    }
}
