//! Node-centric view of a graph: parts become nodes and epsilon paths become links.
//!
//! This is the shape consumed by part-document export, where every part is an
//! individually addressable node instead of an edge annotation.

use indexmap::IndexMap;
use serde::Serialize;

use crate::automaton::graph::{Edge, Graph, NodeId};
use crate::automaton::state::NodeSet;
use crate::category::Category;
use crate::error::{ConstellationError, Result};

/// Index of the synthetic root in [`NodeCentricGraph::nodes`].
pub const ROOT_INDEX: usize = 0;
/// Index of the synthetic accept in [`NodeCentricGraph::nodes`].
pub const ACCEPT_INDEX: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    Root,
    Accept,
    Atom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartNode {
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: PartKind,
    #[serde(rename = "text")]
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Indices of the nodes that may follow this one.
    pub edges: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeCentricGraph {
    pub nodes: Vec<PartNode>,
}

impl NodeCentricGraph {
    /// Translate an edge-centric graph.
    ///
    /// Node 0 is the root, node 1 the single accept, and every atom edge of
    /// `graph` becomes one node after that, in edge order.
    pub fn from_graph(graph: &Graph) -> Result<Self> {
        let root = graph.root().ok_or(ConstellationError::UnsatisfiableGraph)?;
        let atoms: Vec<&Edge> = graph.edges().filter(|edge| !edge.is_epsilon()).collect();
        let mut closures: IndexMap<NodeId, NodeSet> = IndexMap::new();

        let mut links = |from: NodeId| -> Vec<usize> {
            let closure = closures
                .entry(from)
                .or_insert_with(|| epsilon_closure(graph, from));
            let mut next: Vec<usize> = atoms
                .iter()
                .enumerate()
                .filter(|(_, atom)| closure.contains(atom.src))
                .map(|(i, _)| ACCEPT_INDEX + 1 + i)
                .collect();
            if closure
                .iter()
                .any(|id| graph.node(id).is_some_and(|node| node.is_accept()))
            {
                next.push(ACCEPT_INDEX);
            }
            next
        };

        let mut nodes = Vec::with_capacity(atoms.len() + 2);
        nodes.push(PartNode {
            id: ROOT_INDEX,
            kind: PartKind::Root,
            label: "root".to_string(),
            category: None,
            edges: links(root),
        });
        nodes.push(PartNode {
            id: ACCEPT_INDEX,
            kind: PartKind::Accept,
            label: "accept".to_string(),
            category: None,
            edges: Vec::new(),
        });
        for (i, atom) in atoms.iter().enumerate() {
            nodes.push(PartNode {
                id: ACCEPT_INDEX + 1 + i,
                kind: PartKind::Atom,
                label: atom.label.clone(),
                category: atom.component.category().cloned(),
                edges: links(atom.dest),
            });
        }

        Ok(Self { nodes })
    }

    pub fn root(&self) -> Option<&PartNode> {
        self.nodes.get(ROOT_INDEX)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Nodes reachable from `start` over epsilon edges only, `start` included.
fn epsilon_closure(graph: &Graph, start: NodeId) -> NodeSet {
    let mut closure = NodeSet::with_capacity(graph.id_bound());
    let mut stack = vec![start];

    while let Some(id) = stack.pop() {
        if !closure.insert(id) {
            continue;
        }
        let Some(node) = graph.node(id) else {
            continue;
        };
        for edge in node.edges.iter().filter(|edge| edge.is_epsilon()) {
            if !closure.contains(edge.dest) {
                stack.push(edge.dest);
            }
        }
    }

    closure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{CategoryTable, Tolerance};
    use crate::expr::Expr;

    fn view(expr: &Expr) -> NodeCentricGraph {
        let mut categories: CategoryTable = [
            ("a".to_string(), Category::from_ids(["a1"])),
            ("b".to_string(), Category::from_ids(["b1"])),
        ]
        .into_iter()
        .collect();
        let graph = crate::automaton::build_graph(expr, &mut categories, Tolerance::Strict).unwrap();
        NodeCentricGraph::from_graph(&graph).unwrap()
    }

    #[test]
    fn test_sequence_view() {
        let view = view(&Expr::then(Expr::atom("a"), Expr::atom("b")));
        assert_eq!(view.len(), 4);
        assert_eq!(view.nodes[ROOT_INDEX].edges, vec![2]);
        assert_eq!(view.nodes[2].label, "a");
        assert_eq!(view.nodes[2].edges, vec![3]);
        assert_eq!(view.nodes[3].edges, vec![ACCEPT_INDEX]);
    }

    #[test]
    fn test_optional_part_links_root_to_accept() {
        let view = view(&Expr::zero_or_one(Expr::atom("a")));
        assert_eq!(view.nodes[ROOT_INDEX].edges, vec![2, ACCEPT_INDEX]);
        assert_eq!(view.nodes[2].edges, vec![ACCEPT_INDEX]);
    }

    #[test]
    fn test_loop_links_part_to_itself() {
        let view = view(&Expr::one_or_more(Expr::atom("a")));
        assert_eq!(view.nodes[2].edges, vec![2, ACCEPT_INDEX]);
    }

    #[test]
    fn test_epsilon_closure() {
        let mut graph = Graph::new();
        let a = graph.add_epsilon_node();
        let b = graph.add_epsilon_node();
        let c = graph.add_epsilon_node();
        graph.add_edge(Edge::epsilon(a, b)).unwrap();
        graph.add_edge(Edge::epsilon(b, a)).unwrap();
        graph
            .add_edge(Edge::atom(b, c, "x", Category::new()))
            .unwrap();

        let closure = epsilon_closure(&graph, a);
        assert!(closure.contains(a) && closure.contains(b));
        assert!(!closure.contains(c));
    }
}
