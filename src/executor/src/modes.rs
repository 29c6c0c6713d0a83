use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use dependency_planner::DependencyGraph;
use resource_model::Resource;

/// Repeatedly strips the current leaf set from a clone of the graph,
/// returning the keys in the order materialization would visit them.
/// Pure planning output, touches no warehouse state.
pub fn execution_order(graph: &DependencyGraph) -> Vec<String> {
    let mut remaining = graph.clone();
    let mut order = Vec::new();
    while !remaining.is_empty() {
        let mut leaves = remaining.ready_keys();
        leaves.sort();
        for key in &leaves {
            remaining.pending.shift_remove(key);
            for deps in remaining.pending.values_mut() {
                deps.shift_remove(key);
            }
        }
        order.extend(leaves);
    }
    order
}

/// `--show`: the plan, one "would execute <key>" line per resource in
/// dependency order.
pub fn show(graph: &DependencyGraph) -> Vec<String> {
    execution_order(graph)
        .into_iter()
        .map(|key| format!("would execute {key}"))
        .collect()
}

/// `--dotml`: a Graphviz `digraph` with one edge per dependency, child
/// pointing at the thing it depends on.
pub fn dotml(graph: &DependencyGraph) -> String {
    let mut lines = vec!["digraph g {".to_string()];
    for (key, deps) in &graph.pending {
        for dep in deps {
            lines.push(format!("  \"{key}\" -> \"{dep}\"", key = key, dep = dep));
        }
    }
    lines.push("}".to_string());
    lines.join("\n")
}

/// `--dumpToFolder`: like `show`, but additionally writes each resource's
/// rendered definition to `<folder>/<key-with-colons-as-slashes>.debug`.
pub fn dump(graph: &DependencyGraph, resources: &HashMap<String, Resource>, folder: &Path) -> io::Result<Vec<String>> {
    fs::create_dir_all(folder)?;
    let order = execution_order(graph);
    let mut lines = Vec::with_capacity(order.len());
    for key in &order {
        lines.push(format!("would execute {key}"));
        if let Some(resource) = resources.get(key) {
            let file_name = format!("{}.debug", key.replace(':', "/").replace('/', "__"));
            fs::write(folder.join(file_name), resource.dump())?;
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dependency_planner::build_dependency_graph;
    use indexmap::IndexMap;
    use resource_model::{ResourceAddress, ResourceKind};

    fn resource(dataset: &str, name: &str, body: &str) -> Resource {
        Resource {
            address: ResourceAddress::new("proj", dataset, name),
            kind: ResourceKind::Table,
            bodies: vec![body.to_string()],
            options: IndexMap::new(),
        }
    }

    #[test]
    fn show_orders_leaves_before_dependents() {
        let c = resource("ds", "c", "select 1");
        let b = resource("ds", "b", "select * from ds.c");
        let a = resource("ds", "a", "select * from ds.b");
        let graph = build_dependency_graph(&[a, b, c]).unwrap();
        let lines = show(&graph);
        let pos_c = lines.iter().position(|l| l.ends_with("ds:c")).unwrap();
        let pos_b = lines.iter().position(|l| l.ends_with("ds:b")).unwrap();
        let pos_a = lines.iter().position(|l| l.ends_with("ds:a")).unwrap();
        assert!(pos_c < pos_b);
        assert!(pos_b < pos_a);
    }

    #[test]
    fn dotml_emits_one_edge_per_dependency() {
        let b = resource("ds", "b", "select 1");
        let a = resource("ds", "a", "select * from ds.b");
        let graph = build_dependency_graph(&[a, b]).unwrap();
        let dot = dotml(&graph);
        assert!(dot.contains("\"ds:a\" -> \"ds:b\""));
        assert!(dot.starts_with("digraph g {"));
    }

    #[test]
    fn dump_writes_one_file_per_resource() {
        let only = resource("ds", "a", "select 1");
        let graph = build_dependency_graph(&[only.clone()]).unwrap();
        let map: HashMap<String, Resource> = [(only.key(), only)].into_iter().collect();
        let dir = tempfile::tempdir().unwrap();
        let lines = dump(&graph, &map, dir.path()).unwrap();
        assert_eq!(lines.len(), 1);
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
