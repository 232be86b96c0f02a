//! Class registry and alias indexes.
//!
//! The [`ClassRegistry`] owns every [`ClassNode`] keyed by path; the
//! [`AliasIndex`] maps alias, xtype, and alternate class names back to
//! paths. Both are plain owned state, mutated only through the runtime's
//! resolver/builder/override entry points.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::builder::ClassDescriptor;
use crate::directive::DirectiveSet;
use crate::error::EngineError;
use crate::overrides::OverrideRecord;

/// Lifecycle of a class node.
///
/// A node is atomically `Pending` or `Finalized` from any observer's
/// perspective; `Finalizing` exists only to reject re-entrant finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Admitted, hard dependencies not yet satisfied (or failed).
    Pending,
    /// Build in flight; treated as not ready.
    Finalizing,
    /// Descriptor produced; instantiable.
    Finalized,
}

/// One class definition tracked by the registry.
#[derive(Debug, Clone)]
pub struct ClassNode {
    /// Fully-qualified class path.
    pub path: String,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// The submitted directive body (immutable).
    pub directives: DirectiveSet,
    /// Applied override history, in arrival order. Re-finalization replays
    /// this list, so rebuilds are deterministic.
    pub overrides: Vec<OverrideRecord>,
    /// Finalized descriptor, once built.
    pub descriptor: Option<Arc<ClassDescriptor>>,
    /// Sticky failure; re-surfaced on every later `create` for this path.
    pub error: Option<EngineError>,
}

impl ClassNode {
    /// Create a pending node for a submitted directive set.
    pub fn new(directives: DirectiveSet) -> Self {
        Self {
            path: directives.path.clone(),
            state: LifecycleState::Pending,
            directives,
            overrides: Vec::new(),
            descriptor: None,
            error: None,
        }
    }

    /// Whether the node is finalized.
    pub fn is_finalized(&self) -> bool {
        self.state == LifecycleState::Finalized
    }
}

/// Path-keyed store of class nodes.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    nodes: FxHashMap<String, ClassNode>,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. The caller has already handled duplicate/replace
    /// policy; an existing node at the same path is overwritten.
    pub fn insert(&mut self, node: ClassNode) {
        self.nodes.insert(node.path.clone(), node);
    }

    /// Whether a primary definition exists for the path.
    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    /// Get a node.
    pub fn get(&self, path: &str) -> Option<&ClassNode> {
        self.nodes.get(path)
    }

    /// Get a node mutably.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut ClassNode> {
        self.nodes.get_mut(path)
    }

    /// Remove a node (explicit replacement only).
    pub fn remove(&mut self, path: &str) -> Option<ClassNode> {
        self.nodes.remove(path)
    }

    /// Finalized descriptor for a path, if any.
    pub fn descriptor(&self, path: &str) -> Option<Arc<ClassDescriptor>> {
        self.nodes.get(path).and_then(|n| n.descriptor.clone())
    }

    /// Whether the path exists and is finalized.
    pub fn is_finalized(&self, path: &str) -> bool {
        self.nodes.get(path).is_some_and(|n| n.is_finalized())
    }

    /// All registered paths.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes are registered.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop all nodes (test isolation).
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Alias, xtype, and alternate-class-name indexes.
///
/// Many-to-one: a path may own several names. Last registration for a name
/// wins, but re-registering an existing name under a different path is a
/// reportable conflict.
#[derive(Debug, Default)]
pub struct AliasIndex {
    aliases: FxHashMap<String, String>,
    xtypes: FxHashMap<String, String>,
    alternates: FxHashMap<String, String>,
}

impl AliasIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias. Returns the conflict, if any; the new mapping is
    /// applied either way (last writer wins).
    pub fn register_alias(&mut self, alias: &str, path: &str) -> Option<EngineError> {
        Self::register(&mut self.aliases, alias, path)
    }

    /// Register an xtype name.
    pub fn register_xtype(&mut self, xtype: &str, path: &str) -> Option<EngineError> {
        Self::register(&mut self.xtypes, xtype, path)
    }

    /// Register an alternate class name.
    pub fn register_alternate(&mut self, name: &str, path: &str) -> Option<EngineError> {
        Self::register(&mut self.alternates, name, path)
    }

    fn register(
        table: &mut FxHashMap<String, String>,
        name: &str,
        path: &str,
    ) -> Option<EngineError> {
        match table.insert(name.to_string(), path.to_string()) {
            Some(existing) if existing != path => Some(EngineError::AliasConflict {
                alias: name.to_string(),
                existing,
                path: path.to_string(),
            }),
            _ => None,
        }
    }

    /// Resolve a name to a path: alias first, then xtype, then alternate.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.aliases
            .get(name)
            .or_else(|| self.xtypes.get(name))
            .or_else(|| self.alternates.get(name))
            .map(|s| s.as_str())
    }

    /// Resolve only the alias table (the `getAlias` surface).
    pub fn resolve_alias(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(|s| s.as_str())
    }

    /// Drop every name pointing at the given path (explicit replacement).
    pub fn unregister_path(&mut self, path: &str) {
        self.aliases.retain(|_, p| p != path);
        self.xtypes.retain(|_, p| p != path);
        self.alternates.retain(|_, p| p != path);
    }

    /// Drop all entries (test isolation).
    pub fn clear(&mut self) {
        self.aliases.clear();
        self.xtypes.clear();
        self.alternates.clear();
    }
}
