//! Edge-labelled design-space graph.
//!
//! Nodes live in an insertion-ordered arena keyed by [`NodeId`]; edges are owned
//! by their source node and refer to other nodes by id only, so collapsing and
//! product merging are id rewrites.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::automaton::symbol::{
    ACCEPT_LABEL, Component, EPSILON_LABEL, Operator, ROOT_LABEL,
};
use crate::category::Category;
use crate::error::{ConstellationError, Result};

/// Opaque node identifier, unique within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role a node plays in a finished graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Epsilon,
    Root,
    Accept,
}

/// A labelled transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub src: NodeId,
    pub dest: NodeId,
    pub component: Component,
    #[serde(rename = "type")]
    pub operator: Operator,
    #[serde(rename = "text")]
    pub label: String,
}

impl Edge {
    /// A plain epsilon edge.
    pub fn epsilon(src: NodeId, dest: NodeId) -> Self {
        Self::tagged(src, dest, Operator::Epsilon, EPSILON_LABEL)
    }

    /// An epsilon edge recording the operator that created it.
    pub fn tagged(src: NodeId, dest: NodeId, operator: Operator, label: impl Into<String>) -> Self {
        Self {
            src,
            dest,
            component: Component::Epsilon,
            operator,
            label: label.into(),
        }
    }

    /// An edge consuming one part of `category`.
    pub fn atom(src: NodeId, dest: NodeId, label: impl Into<String>, category: Category) -> Self {
        Self {
            src,
            dest,
            component: Component::Part(category),
            operator: Operator::Atom,
            label: label.into(),
        }
    }

    #[inline]
    pub fn is_epsilon(&self) -> bool {
        self.component.is_epsilon()
    }
}

/// A graph node and its outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Set on the unique root; independent of `kind` so a root may also accept.
    #[serde(skip)]
    pub root: bool,
    #[serde(rename = "text")]
    pub label: String,
    #[serde(rename = "operator")]
    pub operators: Vec<Operator>,
    pub edges: Vec<Edge>,
}

impl Node {
    fn epsilon(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Epsilon,
            root: false,
            label: EPSILON_LABEL.to_string(),
            operators: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn has_operator(&self, operator: Operator) -> bool {
        self.operators.contains(&operator)
    }

    pub fn is_accept(&self) -> bool {
        self.kind == NodeKind::Accept
    }
}

/// A design-space automaton.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    next_id: u32,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The single-node stand-in returned when a compilation has no designs.
    pub fn placeholder() -> Self {
        let mut graph = Graph::new();
        graph.add_epsilon_node();
        graph
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a plain epsilon node and return its id.
    pub fn add_epsilon_node(&mut self) -> NodeId {
        let id = self.fresh_id();
        self.nodes.insert(id, Node::epsilon(id));
        id
    }

    /// Add a node with the given kind, root flag, label and operators.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        root: bool,
        label: impl Into<String>,
        operators: Vec<Operator>,
    ) -> NodeId {
        let id = self.fresh_id();
        self.nodes.insert(
            id,
            Node {
                id,
                kind,
                root,
                label: label.into(),
                operators,
                edges: Vec::new(),
            },
        );
        id
    }

    /// Append an edge to its source node.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        if !self.nodes.contains_key(&edge.dest) {
            return Err(ConstellationError::Graph(format!(
                "edge {} -> {} targets a missing node",
                edge.src, edge.dest
            )));
        }
        let src = edge.src;
        match self.nodes.get_mut(&src) {
            Some(node) => {
                node.edges.push(edge);
                Ok(())
            }
            None => Err(ConstellationError::Graph(format!(
                "edge source {src} is not in the graph"
            ))),
        }
    }

    /// Attach an operator tag to a node.
    pub fn tag(&mut self, id: NodeId, operator: Operator) -> Result<()> {
        self.node_mut(id)
            .map(|node| node.operators.push(operator))
            .ok_or_else(|| missing(id))
    }

    /// Get a node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable reference to a node by id.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Check if the graph has a node with this id.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterate over nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    /// Snapshot of the node ids in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    /// Iterate over every edge, grouped by source node.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.nodes.values().flat_map(|node| node.edges.iter())
    }

    /// Get the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// One past the largest id ever handed out; sizes [`NodeSet`]s over this graph.
    ///
    /// [`NodeSet`]: crate::automaton::NodeSet
    pub fn id_bound(&self) -> usize {
        self.next_id as usize
    }

    /// Remove a node, keeping the order of the others. Edges into it are left alone.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.shift_remove(&id)
    }

    /// Drop every edge whose destination is `id`.
    pub fn remove_edges_to(&mut self, id: NodeId) {
        for node in self.nodes.values_mut() {
            node.edges.retain(|edge| edge.dest != id);
        }
    }

    /// The node flagged as root, if any.
    pub fn root(&self) -> Option<NodeId> {
        self.nodes.values().find(|node| node.root).map(|node| node.id)
    }

    /// Ids of all accept nodes, in insertion order.
    pub fn accepts(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.is_accept())
            .map(|node| node.id)
            .collect()
    }

    /// Flag a node as the root. An accept node keeps its kind.
    pub fn mark_root(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id).ok_or_else(|| missing(id))?;
        node.root = true;
        node.label = ROOT_LABEL.to_string();
        if node.kind != NodeKind::Accept {
            node.kind = NodeKind::Root;
        }
        Ok(())
    }

    pub fn mark_accept(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id).ok_or_else(|| missing(id))?;
        node.kind = NodeKind::Accept;
        node.label = ACCEPT_LABEL.to_string();
        Ok(())
    }

    /// Strip root/accept status, turning the node back into a plain epsilon.
    pub fn demote(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id).ok_or_else(|| missing(id))?;
        node.kind = NodeKind::Epsilon;
        node.root = false;
        node.label = EPSILON_LABEL.to_string();
        Ok(())
    }

    /// Predecessor index: node -> set of nodes with an edge into it.
    pub fn parents(&self) -> IndexMap<NodeId, IndexSet<NodeId>> {
        let mut parents: IndexMap<NodeId, IndexSet<NodeId>> = IndexMap::new();
        for edge in self.edges() {
            parents.entry(edge.dest).or_default().insert(edge.src);
        }
        parents
    }

    /// Move every node of `other` into this graph under fresh ids.
    ///
    /// Returns the old-id -> new-id mapping.
    pub fn absorb(&mut self, other: Graph) -> IndexMap<NodeId, NodeId> {
        let mut mapping: IndexMap<NodeId, NodeId> = IndexMap::with_capacity(other.len());
        for &old in other.nodes.keys() {
            let new = self.fresh_id();
            mapping.insert(old, new);
        }

        for (old, mut node) in other.nodes {
            let Some(&new) = mapping.get(&old) else {
                continue;
            };
            node.id = new;
            for edge in &mut node.edges {
                edge.src = new;
                if let Some(&dest) = mapping.get(&edge.dest) {
                    edge.dest = dest;
                }
            }
            self.nodes.insert(new, node);
        }

        mapping
    }

    /// Export as JSON in the `stateGraph` shape: id -> node.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.nodes.len()))?;
        for (id, node) in &self.nodes {
            map.serialize_entry(&id.to_string(), node)?;
        }
        map.end()
    }
}

fn missing(id: NodeId) -> ConstellationError {
    ConstellationError::Graph(format!("node {id} is not in the graph"))
}
