//! Design-space automata: construction, AND products and epsilon collapsing.

pub mod builder;
pub mod collapse;
pub mod graph;
pub mod node_centric;
pub mod product;
pub mod state;
pub mod symbol;

pub use builder::{GraphBuilder, build_graph};
pub use collapse::collapse_epsilons;
pub use graph::{Edge, Graph, Node, NodeId, NodeKind};
pub use node_centric::{NodeCentricGraph, PartKind, PartNode};
pub use product::{Product, and_product};
pub use state::NodeSet;
pub use symbol::{Component, Operator};
