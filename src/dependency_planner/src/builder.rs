use indexmap::{IndexMap, IndexSet};
use resource_model::Resource;
use thiserror::Error;

use crate::cycles::find_cycles;

#[derive(Debug, Error)]
pub enum DependencyPlannerError {
    #[error("duplicate resource key '{0}' encountered while building the dependency graph")]
    DuplicateKey(String),
    #[error("dependency graph has a cycle involving: {}", .0.iter().cloned().collect::<Vec<_>>().join(", "))]
    GraphCycle(IndexSet<String>),
}

/// The mutable working set the executor drives to completion: for every
/// resource key, the set of keys it still waits on.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub pending: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn ready_keys(&self) -> Vec<String> {
        self.pending
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(k, _)| k.clone())
            .collect()
    }
}

/// Iterates every pair `(r, s)` and adds `s.key()` to `r`'s pending-set
/// whenever `r.dependsOn(s)`, then runs cycle detection over the result.
pub fn build_dependency_graph(resources: &[Resource]) -> Result<DependencyGraph, DependencyPlannerError> {
    let mut pending: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for r in resources {
        if pending.insert(r.key(), IndexSet::new()).is_some() {
            return Err(DependencyPlannerError::DuplicateKey(r.key()));
        }
    }

    for r in resources {
        for s in resources {
            if r.depends_on(s) {
                pending.get_mut(&r.key()).unwrap().insert(s.key());
            }
        }
    }

    let cycle = find_cycles(&pending);
    if !cycle.is_empty() {
        tracing::warn!(cycle = ?cycle, "dependency graph has a cycle");
        return Err(DependencyPlannerError::GraphCycle(cycle));
    }

    tracing::debug!(resources = pending.len(), "dependency graph built");
    Ok(DependencyGraph { pending })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap as Map;
    use resource_model::{ResourceAddress, ResourceKind};

    fn resource(dataset: &str, name: &str, body: &str) -> Resource {
        Resource {
            address: ResourceAddress::new("proj", dataset, name),
            kind: ResourceKind::View,
            bodies: vec![body.to_string()],
            options: Map::new(),
        }
    }

    #[test]
    fn s1_linear_chain_has_no_cycle() {
        let a = resource("ds", "a", "select * from ds.b");
        let b = resource("ds", "b", "select * from ds.c");
        let c = resource("ds", "c", "select 1");
        let graph = build_dependency_graph(&[a, b, c]).unwrap();
        assert_eq!(graph.pending["ds:a"].len(), 1);
        assert!(graph.pending["ds:c"].is_empty());
    }

    #[test]
    fn s2_cycle_is_rejected() {
        let a = resource("ds", "a", "select * from ds.b");
        let b = resource("ds", "b", "select * from ds.c");
        let c = resource("ds", "c", "select * from ds.a");
        let d = resource("ds", "d", "select 1");
        let err = build_dependency_graph(&[a, b, c, d]).unwrap_err();
        match err {
            DependencyPlannerError::GraphCycle(nodes) => {
                assert_eq!(nodes.len(), 3);
            }
            other => panic!("expected GraphCycle, got {other:?}"),
        }
    }
}
