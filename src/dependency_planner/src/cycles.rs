use indexmap::{IndexMap, IndexSet};

/// Iteratively removes nodes with empty pending-sets and the edges that
/// pointed at them; whatever survives is exactly the cycle set. Empty
/// result iff the graph is a DAG.
pub fn find_cycles(adjacency: &IndexMap<String, IndexSet<String>>) -> IndexSet<String> {
    let mut remaining = adjacency.clone();

    loop {
        let resolvable: Vec<String> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(k, _)| k.clone())
            .collect();

        if resolvable.is_empty() {
            break;
        }

        for k in &resolvable {
            remaining.shift_remove(k);
        }
        for deps in remaining.values_mut() {
            for k in &resolvable {
                deps.shift_remove(k);
            }
        }
    }

    remaining.into_keys().collect()
}
