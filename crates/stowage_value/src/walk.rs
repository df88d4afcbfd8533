//! Depth-first object walker.
//!
//! [`walk`] traverses a [`Value`] and reports every visited node to a
//! visitor closure together with its depth, parent, field metadata and
//! path. The visitor's return value controls descent into records; for
//! leaves it is ignored.
//!
//! Traversal rules:
//!
//! - `Null` ends the branch silently.
//! - `Variant` is unwrapped in place (same path, same depth).
//! - `Record` increments the depth and is visited, except the root record
//!   unless [`WalkConfig::visit_root`] is set. Its fields follow in
//!   declaration order; private fields are skipped unless
//!   [`WalkConfig::visit_private`] is set.
//! - `Array` and `Map` increment the depth but are never visited
//!   themselves. With [`WalkConfig::ignore_containers`] their contents are
//!   skipped entirely.
//! - Everything else is a leaf and is visited.

use crate::path::{FieldPath, PathSegment};
use crate::value::{Field, Value};
use std::fmt;
use std::sync::Arc;

/// Maximum traversal depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaxDepth {
    /// Walk until every node has been reached.
    #[default]
    Unbounded,
    /// Stop at nodes reached with a depth greater than the limit.
    Limited(usize),
}

impl MaxDepth {
    fn is_exceeded(self, depth: usize) -> bool {
        match self {
            MaxDepth::Unbounded => false,
            MaxDepth::Limited(limit) => depth > limit,
        }
    }
}

/// How record fields are named in paths.
#[derive(Clone, Default)]
pub enum FieldNaming {
    /// Use the declared field name.
    #[default]
    Declared,
    /// Use the annotation registered under this tag, falling back to the
    /// declared name.
    Tag(String),
    /// Use a custom function.
    Custom(Arc<dyn Fn(&Field) -> String + Send + Sync>),
}

impl FieldNaming {
    /// Prefer the annotation registered under `tag`.
    pub fn tag(tag: impl Into<String>) -> Self {
        FieldNaming::Tag(tag.into())
    }

    /// Use a custom naming function.
    pub fn custom(f: impl Fn(&Field) -> String + Send + Sync + 'static) -> Self {
        FieldNaming::Custom(Arc::new(f))
    }

    /// Resolves the path name for a field.
    pub fn resolve(&self, field: &Field) -> String {
        match self {
            FieldNaming::Declared => field.name().to_string(),
            FieldNaming::Tag(tag) => field
                .tag(tag)
                .filter(|name| !name.is_empty())
                .unwrap_or(field.name())
                .to_string(),
            FieldNaming::Custom(f) => f(field),
        }
    }
}

impl fmt::Debug for FieldNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldNaming::Declared => f.write_str("Declared"),
            FieldNaming::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
            FieldNaming::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Controls how [`walk`] traverses a value.
#[derive(Debug, Clone, Default)]
pub struct WalkConfig {
    /// Field naming strategy.
    pub naming: FieldNaming,
    /// Depth bound.
    pub max_depth: MaxDepth,
    /// Skip array and map contents.
    pub ignore_containers: bool,
    /// Walk private fields.
    pub visit_private: bool,
    /// Report the root record to the visitor.
    pub visit_root: bool,
}

impl WalkConfig {
    /// Creates the default configuration: declared names, unbounded depth,
    /// containers walked, private fields and root record skipped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the field naming strategy.
    #[must_use]
    pub fn naming(mut self, naming: FieldNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Sets the depth bound.
    #[must_use]
    pub fn max_depth(mut self, max_depth: MaxDepth) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Skips array and map contents.
    #[must_use]
    pub fn ignore_containers(mut self, ignore: bool) -> Self {
        self.ignore_containers = ignore;
        self
    }

    /// Walks private fields.
    #[must_use]
    pub fn visit_private(mut self, visit: bool) -> Self {
        self.visit_private = visit;
        self
    }

    /// Reports the root record to the visitor.
    #[must_use]
    pub fn visit_root(mut self, visit: bool) -> Self {
        self.visit_root = visit;
        self
    }
}

/// State handed to the visitor for each visited node.
#[derive(Debug, Clone, Copy)]
pub struct WalkerState<'a> {
    /// Nesting depth. The root record is at depth 1.
    pub depth: usize,
    /// The visited node.
    pub current: &'a Value,
    /// The enclosing node, if any.
    pub parent: Option<&'a Value>,
    /// Field metadata when the node is a record field.
    pub field: Option<&'a Field>,
    /// Path from the root.
    pub path: &'a FieldPath,
}

/// Walks `root` depth first, calling `visitor` for each visited node.
///
/// Returning `false` from the visitor for a record skips that record's
/// fields; the rest of the walk continues.
pub fn walk<F>(root: &Value, config: &WalkConfig, visitor: F)
where
    F: FnMut(&WalkerState<'_>) -> bool,
{
    let mut walker = Walker {
        config,
        visitor,
        path: FieldPath::root(),
    };
    walker.walk(root, None, None, 0);
}

struct Walker<'c, F> {
    config: &'c WalkConfig,
    visitor: F,
    path: FieldPath,
}

impl<F> Walker<'_, F>
where
    F: FnMut(&WalkerState<'_>) -> bool,
{
    fn walk(&mut self, current: &Value, parent: Option<&Value>, field: Option<&Field>, depth: usize) {
        if self.config.max_depth.is_exceeded(depth) {
            return;
        }
        match current {
            Value::Null => {}
            Value::Variant(_, inner) => self.walk(inner, Some(current), field, depth),
            Value::Record(record) => {
                let depth = depth + 1;
                let report = depth != 1 || self.config.visit_root;
                if report && !self.visit(current, parent, field, depth) {
                    return;
                }
                for (child_field, child) in record.fields() {
                    if child_field.is_private() && !self.config.visit_private {
                        continue;
                    }
                    let name = self.config.naming.resolve(child_field);
                    self.path.push(PathSegment::Field(name));
                    self.walk(child, Some(current), Some(child_field), depth);
                    self.path.pop();
                }
            }
            Value::Array(items) => {
                if self.config.ignore_containers {
                    return;
                }
                for (i, item) in items.iter().enumerate() {
                    self.path.push(PathSegment::Index(i));
                    self.walk(item, Some(current), None, depth + 1);
                    self.path.pop();
                }
            }
            Value::Map(pairs) => {
                if self.config.ignore_containers {
                    return;
                }
                for (key, item) in pairs {
                    self.path.push(PathSegment::Key(key.to_key_string()));
                    self.walk(item, Some(current), None, depth + 1);
                    self.path.pop();
                }
            }
            _ => {
                self.visit(current, parent, field, depth);
            }
        }
    }

    fn visit(
        &mut self,
        current: &Value,
        parent: Option<&Value>,
        field: Option<&Field>,
        depth: usize,
    ) -> bool {
        let state = WalkerState {
            depth,
            current,
            parent,
            field,
            path: &self.path,
        };
        (self.visitor)(&state)
    }
}
