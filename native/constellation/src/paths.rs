//! Bounded enumeration of accepting paths.
//!
//! Cycles are unrolled a limited number of times: an edge may be taken at most
//! `max_cycles + 1` times along one path, a node at most `max_cycles + 2`
//! times, and a node heading a one-or-more loop at most `max_cycles + 1` times.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::automaton::graph::{Edge, Graph, NodeId};
use crate::automaton::symbol::{EPSILON_LABEL, Operator};
use crate::error::{ConstellationError, Result};

/// The atom edges along one accepting walk, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Path(Vec<Edge>);

impl Path {
    pub fn edges(&self) -> &[Edge] {
        &self.0
    }

    pub fn labels(&self) -> Vec<&str> {
        self.0.iter().map(|edge| edge.label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same parts between the same nodes, edge for edge.
    fn same_walk(&self, other: &[Edge]) -> bool {
        self.0.len() == other.len()
            && self.0.iter().zip(other).all(|(a, b)| {
                a.component == b.component && a.src == b.src && a.dest == b.dest
            })
    }
}

impl From<Vec<Edge>> for Path {
    fn from(edges: Vec<Edge>) -> Self {
        Path(edges)
    }
}

/// Enumerate every accepting path from the root of `graph`.
///
/// Paths without atoms are dropped, as are repeats of a path already found.
pub fn enumerate_paths(graph: &Graph, max_cycles: u32) -> Result<Vec<Path>> {
    let root = graph.root().ok_or(ConstellationError::UnsatisfiableGraph)?;
    let mut walker = Walker {
        graph,
        max_cycles: i64::from(max_cycles),
        edge_visits: HashMap::new(),
        node_visits: HashMap::new(),
        current: Vec::new(),
        paths: Vec::new(),
    };
    walker.visit(root, None);
    debug!(paths = walker.paths.len(), max_cycles, "enumerated paths");
    Ok(walker.paths)
}

/// Identity of an edge for visit counting; `None` source is the entry into the root.
type EdgeKey<'g> = (Option<NodeId>, NodeId, &'g str);

struct Walker<'g> {
    graph: &'g Graph,
    max_cycles: i64,
    // Counters may dip below zero after the zero-or-more skip adjustment.
    edge_visits: HashMap<EdgeKey<'g>, i64>,
    node_visits: HashMap<NodeId, i64>,
    current: Vec<&'g Edge>,
    paths: Vec<Path>,
}

impl<'g> Walker<'g> {
    fn visit(&mut self, id: NodeId, via: Option<&'g Edge>) {
        let graph = self.graph;
        let Some(node) = graph.node(id) else {
            return;
        };
        let key: EdgeKey<'g> = match via {
            Some(edge) => (Some(edge.src), edge.dest, edge.label.as_str()),
            None => (None, id, EPSILON_LABEL),
        };

        let node_count = self.node_visits.get(&id).copied().unwrap_or(0);
        let edge_count = self.edge_visits.get(&key).copied().unwrap_or(0);
        if node.has_operator(Operator::OneOrMore) && node_count > self.max_cycles {
            return;
        }
        if edge_count > self.max_cycles || node_count > self.max_cycles + 1 {
            return;
        }

        *self.edge_visits.entry(key).or_insert(0) += 1;
        *self.node_visits.entry(id).or_insert(0) += 1;
        if let Some(edge) = via {
            self.current.push(edge);
        }

        if node.is_accept() {
            self.record();
        }

        let skipped = via
            .and_then(|edge| graph.node(edge.src))
            .is_some_and(|src| src.has_operator(Operator::ZeroOrMore));
        if skipped {
            *self.node_visits.entry(id).or_insert(0) -= 1;
        }

        for edge in &node.edges {
            self.visit(edge.dest, Some(edge));
        }

        if via.is_some() {
            self.current.pop();
        }
        *self.edge_visits.entry(key).or_insert(0) -= 1;
        *self.node_visits.entry(id).or_insert(0) -= 1;
    }

    fn record(&mut self) {
        let atoms: Vec<Edge> = self
            .current
            .iter()
            .filter(|edge| !edge.is_epsilon())
            .map(|&edge| edge.clone())
            .collect();
        if atoms.is_empty() || self.paths.iter().any(|path| path.same_walk(&atoms)) {
            return;
        }
        self.paths.push(Path(atoms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{build_graph, collapse_epsilons};
    use crate::category::{Category, CategoryTable, Tolerance};
    use crate::expr::Expr;

    fn paths(expr: &Expr, max_cycles: u32) -> Vec<Vec<String>> {
        let mut categories: CategoryTable = [
            ("a".to_string(), Category::from_ids(["a1"])),
            ("b".to_string(), Category::from_ids(["b1"])),
        ]
        .into_iter()
        .collect();
        let mut graph = build_graph(expr, &mut categories, Tolerance::Strict).unwrap();
        collapse_epsilons(&mut graph);
        enumerate_paths(&graph, max_cycles)
            .unwrap()
            .iter()
            .map(|path| path.labels().into_iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_one_or_more_without_cycles() {
        let found = paths(&Expr::one_or_more(Expr::atom("a")), 0);
        assert_eq!(found, vec![vec!["a".to_string()]]);
    }

    #[test]
    fn test_one_or_more_with_two_cycles() {
        let found = paths(&Expr::one_or_more(Expr::atom("a")), 2);
        let lengths: Vec<usize> = found.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![1, 2, 3]);
    }

    #[test]
    fn test_or_yields_both_branches() {
        let found = paths(&Expr::or([Expr::atom("a"), Expr::atom("b")]), 0);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&vec!["a".to_string()]));
        assert!(found.contains(&vec!["b".to_string()]));
    }

    #[test]
    fn test_zero_or_one_drops_the_empty_path() {
        let found = paths(
            &Expr::then(Expr::zero_or_one(Expr::atom("a")), Expr::atom("b")),
            0,
        );
        assert_eq!(found.len(), 2);
        assert!(found.contains(&vec!["b".to_string()]));
        assert!(found.contains(&vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_zero_or_more_terminates() {
        let found = paths(&Expr::zero_or_more(Expr::atom("a")), 1);
        assert!(!found.is_empty());
        assert!(found.iter().all(|path| path.iter().all(|label| label == "a")));
    }

    #[test]
    fn test_zero_or_more_before_atom() {
        let found = paths(
            &Expr::then(Expr::zero_or_more(Expr::atom("a")), Expr::atom("b")),
            1,
        );
        assert_eq!(
            found,
            vec![
                vec!["a".to_string(), "a".to_string(), "b".to_string()],
                vec!["a".to_string(), "b".to_string()],
                vec!["b".to_string()],
            ]
        );
    }

    #[test]
    fn test_missing_root_is_unsatisfiable() {
        let graph = Graph::placeholder();
        assert!(matches!(
            enumerate_paths(&graph, 0),
            Err(ConstellationError::UnsatisfiableGraph)
        ));
    }
}
