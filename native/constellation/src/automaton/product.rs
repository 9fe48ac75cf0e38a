//! AND combination of two finished graphs.
//!
//! The product has one node per pair of operand nodes. An atom edge pair
//! survives when its two categories combine to something non-empty under the
//! configured [`Tolerance`]; epsilon edges of either side are replayed against
//! every node of the other. Dead ends and unreachable nodes are then pruned.

use indexmap::IndexMap;
use tracing::debug;

use crate::automaton::graph::{Edge, Graph, Node, NodeId, NodeKind};
use crate::automaton::symbol::{ACCEPT_LABEL, EPSILON_LABEL, ROOT_LABEL};
use crate::category::{Category, CategoryTable, Tolerance};
use crate::error::{ConstellationError, Result};

/// Result of an AND combination.
#[derive(Debug, Clone)]
pub struct Product {
    pub graph: Graph,
    /// Categories of the product's atom edges, keyed by the merged edge labels.
    pub categories: CategoryTable,
}

type Pairs = IndexMap<(NodeId, NodeId), NodeId>;

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    /// Split a pair into (this side, other side).
    fn split(self, (left, right): (NodeId, NodeId)) -> (NodeId, NodeId) {
        match self {
            Side::Left => (left, right),
            Side::Right => (right, left),
        }
    }

    fn join(self, own: NodeId, other: NodeId) -> (NodeId, NodeId) {
        match self {
            Side::Left => (own, other),
            Side::Right => (other, own),
        }
    }
}

/// Intersect `left` and `right`.
///
/// Edge labels are resolved in `left_categories` and `right_categories`
/// respectively. Returns [`ConstellationError::EmptyIntersection`] when no
/// rooted graph survives pruning.
pub fn and_product(
    left: &Graph,
    left_categories: &CategoryTable,
    right: &Graph,
    right_categories: &CategoryTable,
    tolerance: Tolerance,
) -> Result<Product> {
    let mut graph = Graph::new();
    let pairs = product_nodes(&mut graph, left, right);

    let mut categories = CategoryTable::new();
    for n1 in left.nodes() {
        for n2 in right.nodes() {
            let src = pair(&pairs, (n1.id, n2.id))?;
            for e1 in n1.edges.iter().filter(|edge| !edge.is_epsilon()) {
                let c1 = lookup(left_categories, &e1.label)?;
                for e2 in n2.edges.iter().filter(|edge| !edge.is_epsilon()) {
                    let c2 = lookup(right_categories, &e2.label)?;
                    let common = c1.combine(c2, tolerance);
                    if common.is_empty() {
                        continue;
                    }
                    let label = categories.register_merged(&e1.label, &e2.label, common.clone());
                    let dest = pair(&pairs, (e1.dest, e2.dest))?;
                    graph.add_edge(Edge::atom(src, dest, label, common))?;
                }
            }
        }
    }

    propagate_epsilons(&mut graph, &pairs, left, Side::Left)?;
    propagate_epsilons(&mut graph, &pairs, right, Side::Right)?;

    let total = graph.len();
    prune_dead_ends(&mut graph);
    prune_unreachable(&mut graph);
    debug!(
        left = left.len(),
        right = right.len(),
        pairs = total,
        kept = graph.len(),
        %tolerance,
        "AND product"
    );

    if graph.is_empty() || graph.root().is_none() {
        return Err(ConstellationError::EmptyIntersection { tolerance });
    }
    Ok(Product { graph, categories })
}

fn product_nodes(graph: &mut Graph, left: &Graph, right: &Graph) -> Pairs {
    let mut pairs = Pairs::with_capacity(left.len() * right.len());
    for n1 in left.nodes() {
        for n2 in right.nodes() {
            let kind = match (n1.kind, n2.kind) {
                (NodeKind::Root, NodeKind::Root) => NodeKind::Root,
                (NodeKind::Accept, NodeKind::Accept) => NodeKind::Accept,
                _ => NodeKind::Epsilon,
            };
            let root = n1.root && n2.root;
            let label = pair_label(n1, n2, root);
            let operators = if n1.operators == n2.operators {
                n1.operators.clone()
            } else {
                Vec::new()
            };
            let id = graph.add_node(kind, root, label, operators);
            pairs.insert((n1.id, n2.id), id);
        }
    }
    pairs
}

fn pair_label(n1: &Node, n2: &Node, root: bool) -> &'static str {
    if root {
        ROOT_LABEL
    } else if n1.label == ACCEPT_LABEL && n2.label == ACCEPT_LABEL {
        ACCEPT_LABEL
    } else {
        EPSILON_LABEL
    }
}

/// Replay `source`'s epsilon edges from every product node built on their source.
fn propagate_epsilons(graph: &mut Graph, pairs: &Pairs, source: &Graph, side: Side) -> Result<()> {
    for edge in source.edges().filter(|edge| edge.is_epsilon()) {
        for (&key, &src) in pairs {
            let (own, other) = side.split(key);
            if own != edge.src {
                continue;
            }
            let dest = pair(pairs, side.join(edge.dest, other))?;
            let plain = graph
                .node(dest)
                .is_none_or(|node| node.operators.is_empty());
            let mirrored = if plain {
                Edge::epsilon(src, dest)
            } else {
                Edge::tagged(src, dest, edge.operator, edge.label.clone())
            };
            graph.add_edge(mirrored)?;
        }
    }
    Ok(())
}

/// Repeatedly drop non-accept nodes without outgoing edges.
fn prune_dead_ends(graph: &mut Graph) {
    loop {
        let dead: Vec<NodeId> = graph
            .nodes()
            .filter(|node| node.edges.is_empty() && !node.is_accept())
            .map(|node| node.id)
            .collect();
        if dead.is_empty() {
            return;
        }
        for id in dead {
            graph.remove_node(id);
            graph.remove_edges_to(id);
        }
    }
}

/// One pass dropping non-root nodes that nothing points at.
fn prune_unreachable(graph: &mut Graph) {
    for id in graph.node_ids() {
        if graph.node(id).is_none_or(|node| node.root) {
            continue;
        }
        if !graph.edges().any(|edge| edge.dest == id) {
            graph.remove_node(id);
        }
    }
}

fn pair(pairs: &Pairs, key: (NodeId, NodeId)) -> Result<NodeId> {
    pairs.get(&key).copied().ok_or_else(|| {
        ConstellationError::Graph(format!(
            "edge targets ({}, {}) outside the operand graphs",
            key.0, key.1
        ))
    })
}

fn lookup<'c>(categories: &'c CategoryTable, label: &str) -> Result<&'c Category> {
    categories
        .get(label)
        .ok_or_else(|| ConstellationError::UndefinedCategory(label.to_string()))
}
