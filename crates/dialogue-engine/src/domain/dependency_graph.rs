//! A reusable DAG helper for implementing `DomainModel::depends` (spec §9
//! "Domain dependency graph").

use std::collections::{HashMap, HashSet};

use crate::config::DependencyCyclePolicy;
use crate::types::EngineError;

/// Tracks `depends(a, b)` edges (`a` presupposes `b`) keyed by predicate
/// name, rejecting or dropping registrations that would close a cycle
/// per `policy`.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }

    /// Register `depends(from, to)`. Fails with
    /// `EngineError::DependencyCycleDetected` under `Error` policy if the
    /// edge would close a cycle; silently skips the edge under `Drop`.
    pub fn register(
        &mut self,
        from: &str,
        to: &str,
        policy: DependencyCyclePolicy,
    ) -> Result<(), EngineError> {
        if let Some(cycle) = self.would_cycle(from, to) {
            return match policy {
                DependencyCyclePolicy::Error => Err(EngineError::DependencyCycleDetected {
                    question: from.to_string(),
                    cycle,
                }),
                DependencyCyclePolicy::Drop => Ok(()),
            };
        }
        self.edges
            .entry(from.to_string())
            .or_default()
            .push(to.to_string());
        Ok(())
    }

    pub fn depends(&self, from: &str, to: &str) -> bool {
        self.edges
            .get(from)
            .map(|tos| tos.iter().any(|t| t == to))
            .unwrap_or(false)
    }

    /// All predicates `from` directly or transitively depends on.
    pub fn transitive_dependencies(&self, from: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![from.to_string()];
        while let Some(node) = stack.pop() {
            if let Some(tos) = self.edges.get(&node) {
                for to in tos {
                    if seen.insert(to.clone()) {
                        stack.push(to.clone());
                    }
                }
            }
        }
        seen
    }

    /// Would adding edge `from -> to` create a cycle? Returns the cycle
    /// path (`to -> ... -> from`) if so.
    fn would_cycle(&self, from: &str, to: &str) -> Option<Vec<String>> {
        if from == to {
            return Some(vec![from.to_string(), to.to_string()]);
        }
        let mut visited = HashSet::new();
        let mut path = vec![to.to_string()];
        self.find_path(to, from, &mut visited, &mut path)
            .then_some(path)
    }

    fn find_path(
        &self,
        current: &str,
        target: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> bool {
        if current == target {
            return true;
        }
        if !visited.insert(current.to_string()) {
            return false;
        }
        if let Some(tos) = self.edges.get(current) {
            for to in tos {
                path.push(to.clone());
                if self.find_path(to, target, visited, path) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_acyclic_edges() {
        let mut graph = DependencyGraph::new();
        graph
            .register("price_quote", "depart_day", DependencyCyclePolicy::Error)
            .unwrap();
        assert!(graph.depends("price_quote", "depart_day"));
    }

    #[test]
    fn rejects_cycle_under_error_policy() {
        let mut graph = DependencyGraph::new();
        graph
            .register("b", "a", DependencyCyclePolicy::Error)
            .unwrap();
        let result = graph.register("a", "b", DependencyCyclePolicy::Error);
        assert!(result.is_err());
    }

    #[test]
    fn drops_cycle_under_drop_policy() {
        let mut graph = DependencyGraph::new();
        graph
            .register("b", "a", DependencyCyclePolicy::Drop)
            .unwrap();
        let result = graph.register("a", "b", DependencyCyclePolicy::Drop);
        assert!(result.is_ok());
        assert!(!graph.depends("a", "b"));
    }

    #[test]
    fn rejects_self_dependency() {
        let mut graph = DependencyGraph::new();
        let result = graph.register("a", "a", DependencyCyclePolicy::Error);
        assert!(result.is_err());
    }

    #[test]
    fn transitive_dependencies_follow_chain() {
        let mut graph = DependencyGraph::new();
        graph
            .register("c", "b", DependencyCyclePolicy::Error)
            .unwrap();
        graph
            .register("b", "a", DependencyCyclePolicy::Error)
            .unwrap();
        let deps = graph.transitive_dependencies("c");
        assert!(deps.contains("b"));
        assert!(deps.contains("a"));
    }
}
