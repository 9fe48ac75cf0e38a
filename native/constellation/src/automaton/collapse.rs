//! Epsilon collapsing.
//!
//! A plain epsilon node with exactly one outgoing edge is a pass-through: its
//! parents can point straight at whatever it points at. Nodes carrying an
//! operator tag, root and accept nodes, and nodes on a self-loop are kept.

use tracing::trace;

use crate::automaton::graph::{Graph, NodeKind};

/// Remove pass-through epsilon nodes in a single sweep over a snapshot of the
/// node ids. Returns the number of nodes removed.
///
/// Nodes made collapsible by an earlier removal in the same sweep are not
/// revisited; callers that need a tighter graph call this again.
pub fn collapse_epsilons(graph: &mut Graph) -> usize {
    let mut parents = graph.parents();
    let mut removed = 0;

    for id in graph.node_ids() {
        let (child, via) = match graph.node(id) {
            Some(node)
                if node.kind == NodeKind::Epsilon
                    && !node.root
                    && node.operators.is_empty()
                    && node.edges.len() == 1 =>
            {
                (node.edges[0].dest, node.edges[0].clone())
            }
            _ => continue,
        };

        let preds: Vec<_> = parents
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        // Rewiring a self-loop would drop its only target.
        if child == id || preds.contains(&child) {
            continue;
        }

        for &pid in &preds {
            let Some(parent) = graph.node_mut(pid) else {
                continue;
            };
            if via.is_epsilon() {
                for edge in parent.edges.iter_mut().filter(|edge| edge.dest == id) {
                    edge.dest = child;
                }
            } else {
                parent.edges.retain(|edge| edge.dest != id);
                let mut edge = via.clone();
                edge.src = pid;
                parent.edges.push(edge);
            }
        }

        if let Some(set) = parents.get_mut(&child) {
            set.shift_remove(&id);
            set.extend(preds.iter().copied());
        }
        parents.shift_remove(&id);
        graph.remove_node(id);
        removed += 1;
        trace!(node = %id, %child, "collapsed epsilon node");
    }

    removed
}
