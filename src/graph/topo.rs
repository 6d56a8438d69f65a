//! Graph construction and orderings.
//!
//! Edges follow the natural dependency direction: `A → B` means A depends on B.
//! Every traversal here is iterative, so deep call chains in large
//! repositories cannot overflow the stack.

use std::collections::{btree_set, BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{error, warn};

use super::Graph;
use crate::models::CodeComponent;

static NO_EDGES: BTreeSet<String> = BTreeSet::new();

fn successors<'a>(graph: &'a Graph, node: &str) -> btree_set::Iter<'a, String> {
    graph.get(node).unwrap_or(&NO_EDGES).iter()
}

/// Adjacency map over the components, keeping only edges to known ids.
pub fn build_graph(components: &BTreeMap<String, CodeComponent>) -> Graph {
    components
        .iter()
        .map(|(id, component)| {
            let edges = component
                .depends_on
                .iter()
                .filter(|dep| components.contains_key(dep.as_str()))
                .cloned()
                .collect();
            (id.clone(), edges)
        })
        .collect()
}

/// Strongly connected components with more than one member (Tarjan).
pub fn detect_cycles(graph: &Graph) -> Vec<Vec<String>> {
    let mut next_index = 0usize;
    let mut indices: HashMap<&str, usize> = HashMap::new();
    let mut lowlinks: HashMap<&str, usize> = HashMap::new();
    let mut stack: Vec<&str> = Vec::new();
    let mut on_stack: HashSet<&str> = HashSet::new();
    let mut cycles = Vec::new();

    for root in graph.keys() {
        if indices.contains_key(root.as_str()) {
            continue;
        }

        let root = root.as_str();
        indices.insert(root, next_index);
        lowlinks.insert(root, next_index);
        next_index += 1;
        stack.push(root);
        on_stack.insert(root);
        let mut work: Vec<(&str, btree_set::Iter<'_, String>)> =
            vec![(root, successors(graph, root))];

        while let Some((node, edges)) = work.last_mut() {
            let node: &str = *node;

            if let Some(succ) = edges.next() {
                let succ = succ.as_str();
                match indices.get(succ).copied() {
                    None => {
                        indices.insert(succ, next_index);
                        lowlinks.insert(succ, next_index);
                        next_index += 1;
                        stack.push(succ);
                        on_stack.insert(succ);
                        work.push((succ, successors(graph, succ)));
                    }
                    Some(succ_index) if on_stack.contains(succ) => {
                        let low = lowlinks[node].min(succ_index);
                        lowlinks.insert(node, low);
                    }
                    Some(_) => {}
                }
                continue;
            }

            work.pop();
            if let Some(parent) = work.last().map(|(parent, _)| *parent) {
                let low = lowlinks[parent].min(lowlinks[node]);
                lowlinks.insert(parent, low);
            }

            if lowlinks[node] == indices[node] {
                let mut scc = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack.remove(member);
                    scc.push(member.to_string());
                    if member == node {
                        break;
                    }
                }
                if scc.len() > 1 {
                    cycles.push(scc);
                }
            }
        }
    }

    cycles
}

/// Copy of `graph` with every edge inside a cycle removed.
pub fn resolve_cycles(graph: &Graph) -> Graph {
    let cycles = detect_cycles(graph);
    if cycles.is_empty() {
        return graph.clone();
    }

    warn!(count = cycles.len(), "detected dependency cycles, resolving");
    let mut resolved = graph.clone();

    for cycle in &cycles {
        let members: HashSet<&str> = cycle.iter().map(String::as_str).collect();
        for node in cycle {
            let Some(edges) = resolved.get_mut(node) else {
                continue;
            };
            edges.retain(|dep| {
                let internal = members.contains(dep.as_str());
                if internal {
                    warn!(from = %node, to = %dep, "breaking cycle edge");
                }
                !internal
            });
        }
    }

    resolved
}

/// Kahn's algorithm: every dependency comes before its dependents.
///
/// Among nodes that are ready at the same time the smallest id goes first.
pub fn topological_sort(graph: &Graph) -> Vec<String> {
    let graph = resolve_cycles(graph);

    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = graph.keys().map(|n| (n.as_str(), 0)).collect();

    for (dependent, deps) in &graph {
        for dep in deps.iter().filter(|d| graph.contains_key(d.as_str())) {
            dependents.entry(dep.as_str()).or_default().push(dependent.as_str());
            *in_degree.entry(dependent.as_str()).or_default() += 1;
        }
    }

    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| *node)
        .collect();
    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node.to_string());
        for child in dependents.get(node).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(child) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(*child);
                }
            }
        }
    }

    if order.len() != graph.len() {
        error!("topological sort failed due to unresolved cycles");
        return graph.keys().cloned().collect();
    }

    order
}

/// Post-order walk from every node in id order, visiting dependencies in id
/// order, so each node appears after everything it depends on.
pub fn dependency_first_dfs(graph: &Graph) -> Vec<String> {
    let graph = resolve_cycles(graph);

    let mut visited: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(graph.len());

    for root in graph.keys() {
        if !visited.insert(root.as_str()) {
            continue;
        }
        let mut work = vec![(root.as_str(), successors(&graph, root))];

        while let Some((node, edges)) = work.last_mut() {
            let node: &str = *node;
            match edges.next() {
                Some(dep) => {
                    if visited.insert(dep.as_str()) {
                        work.push((dep.as_str(), successors(&graph, dep)));
                    }
                }
                None => {
                    order.push(node.to_string());
                    work.pop();
                }
            }
        }
    }

    order
}
