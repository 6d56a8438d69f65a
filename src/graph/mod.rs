//! Dependency graph construction, cycle handling and orderings.

use std::collections::{BTreeMap, BTreeSet};

pub mod rules;
pub mod topo;

/// Adjacency map: component id → ids it depends on.
pub type Graph = BTreeMap<String, BTreeSet<String>>;

pub use topo::{build_graph, dependency_first_dfs, resolve_cycles, topological_sort};
