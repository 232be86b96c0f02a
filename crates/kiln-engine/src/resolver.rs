//! Dependency graph for class resolution.
//!
//! Tracks hard edges (`extend`, `mixins`, `requires` — must finalize before
//! the dependent can) and soft edges (`uses` — never block, may stay
//! unsatisfied forever). Cycle detection runs at admission over the
//! not-yet-finalized subgraph, so a cycle is reported exactly once: when
//! the edge that closes it arrives.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::directive::DirectiveSet;
use crate::error::EngineError;

/// Hard/soft dependency graph over class paths.
#[derive(Debug, Default)]
pub struct DependencyResolver {
    /// Adjacency list: path -> hard dependency paths.
    hard: FxHashMap<String, Vec<String>>,
    /// Adjacency list: path -> soft dependency paths.
    soft: FxHashMap<String, Vec<String>>,
    /// Reverse hard edges: path -> paths that hard-depend on it. Drives
    /// override propagation to finalized descendants.
    dependents: FxHashMap<String, Vec<String>>,
}

impl DependencyResolver {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending node's edges.
    pub fn admit(&mut self, directives: &DirectiveSet) {
        let path = directives.path.clone();
        let hard = directives.hard_dependencies();
        for dep in &hard {
            let dependents = self.dependents.entry(dep.clone()).or_default();
            if !dependents.contains(&path) {
                dependents.push(path.clone());
            }
        }
        self.hard.insert(path.clone(), hard);
        self.soft.insert(path, directives.uses.clone());
    }

    /// Remove a node's edges (explicit replacement only).
    pub fn remove(&mut self, path: &str) {
        if let Some(deps) = self.hard.remove(path) {
            for dep in deps {
                if let Some(dependents) = self.dependents.get_mut(&dep) {
                    dependents.retain(|p| p != path);
                }
            }
        }
        self.soft.remove(path);
    }

    /// Hard dependencies of a path, empty if unknown.
    pub fn hard_deps(&self, path: &str) -> &[String] {
        self.hard.get(path).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Paths that hard-depend on the given path.
    pub fn dependents_of(&self, path: &str) -> &[String] {
        self.dependents
            .get(path)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Hard dependencies of `path` not satisfied per the predicate.
    pub fn unresolved<F>(&self, path: &str, is_satisfied: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.hard_deps(path)
            .iter()
            .filter(|dep| !is_satisfied(dep))
            .cloned()
            .collect()
    }

    /// Detect a hard-edge cycle reachable from a newly admitted node,
    /// ignoring edges into already-satisfied (finalized) nodes.
    ///
    /// Returns the cycle rendered as `a -> b -> a`.
    pub fn find_cycle<F>(&self, start: &str, is_satisfied: F) -> Option<EngineError>
    where
        F: Fn(&str) -> bool,
    {
        let mut visited = FxHashSet::default();
        let mut rec_stack = FxHashSet::default();
        let mut path = Vec::new();
        self.dfs_cycle(start, &is_satisfied, &mut visited, &mut rec_stack, &mut path)
            .map(|cycle| EngineError::CyclicDependency {
                path: start.to_string(),
                cycle: cycle.join(" -> "),
            })
    }

    fn dfs_cycle<F>(
        &self,
        node: &str,
        is_satisfied: &F,
        visited: &mut FxHashSet<String>,
        rec_stack: &mut FxHashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>>
    where
        F: Fn(&str) -> bool,
    {
        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        if let Some(neighbors) = self.hard.get(node) {
            for neighbor in neighbors {
                // A finalized dependency can never be part of a pending cycle
                if is_satisfied(neighbor) {
                    continue;
                }
                if !visited.contains(neighbor) {
                    if let Some(cycle) =
                        self.dfs_cycle(neighbor, is_satisfied, visited, rec_stack, path)
                    {
                        return Some(cycle);
                    }
                } else if rec_stack.contains(neighbor) {
                    let cycle_start = path.iter().position(|p| p == neighbor).unwrap();
                    let mut cycle = path[cycle_start..].to_vec();
                    cycle.push(neighbor.clone());
                    return Some(cycle);
                }
            }
        }

        rec_stack.remove(node);
        path.pop();
        None
    }

    /// Drop all edges (test isolation).
    pub fn clear(&mut self) {
        self.hard.clear();
        self.soft.clear();
        self.dependents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn directives(path: &str, body: serde_json::Value) -> DirectiveSet {
        let mut ds = DirectiveSet::from_value(body).unwrap();
        ds.path = path.to_string();
        ds
    }

    #[test]
    fn test_edges_recorded() {
        let mut resolver = DependencyResolver::new();
        resolver.admit(&directives(
            "Widget.A",
            json!({ "extend": "Widget.Base", "requires": ["Util.X"], "uses": ["Util.Lazy"] }),
        ));

        assert_eq!(resolver.hard_deps("Widget.A"), ["Widget.Base", "Util.X"]);
        assert_eq!(resolver.dependents_of("Widget.Base"), ["Widget.A"]);
        assert!(resolver.dependents_of("Util.Lazy").is_empty());
    }

    #[test]
    fn test_no_cycle_through_finalized() {
        let mut resolver = DependencyResolver::new();
        resolver.admit(&directives("A", json!({ "extend": "B" })));
        resolver.admit(&directives("B", json!({ "requires": ["A"] })));

        // With B's edge back to A, a cycle exists among pending nodes
        assert!(resolver.find_cycle("B", |_| false).is_some());
        // If A were finalized, the edge into it cannot close a cycle
        assert!(resolver.find_cycle("B", |p| p == "A").is_none());
    }

    #[test]
    fn test_transitive_cycle_path() {
        let mut resolver = DependencyResolver::new();
        resolver.admit(&directives("A", json!({ "requires": ["B"] })));
        resolver.admit(&directives("B", json!({ "requires": ["C"] })));
        resolver.admit(&directives("C", json!({ "requires": ["A"] })));

        let err = resolver.find_cycle("C", |_| false).unwrap();
        match err {
            EngineError::CyclicDependency { cycle, .. } => {
                assert!(cycle.contains("A") && cycle.contains("B") && cycle.contains("C"));
            }
            other => panic!("expected CyclicDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_soft_edges_do_not_cycle() {
        let mut resolver = DependencyResolver::new();
        resolver.admit(&directives("A", json!({ "uses": ["B"] })));
        resolver.admit(&directives("B", json!({ "uses": ["A"] })));
        assert!(resolver.find_cycle("B", |_| false).is_none());
    }

    #[test]
    fn test_unresolved_filter() {
        let mut resolver = DependencyResolver::new();
        resolver.admit(&directives(
            "A",
            json!({ "requires": ["B", "C"] }),
        ));
        let missing = resolver.unresolved("A", |p| p == "B");
        assert_eq!(missing, vec!["C"]);
    }

    #[test]
    fn test_remove_clears_reverse_edges() {
        let mut resolver = DependencyResolver::new();
        resolver.admit(&directives("A", json!({ "extend": "B" })));
        resolver.remove("A");
        assert!(resolver.dependents_of("B").is_empty());
        assert!(resolver.hard_deps("A").is_empty());
    }
}
