//! Graph construction from expression trees.
//!
//! The builder walks the tree post-order and keeps a stack of open frames.
//! Each frame is the boundary of a finished subgraph: one entry node and the
//! exit nodes still waiting for a successor. Operators pop their operands'
//! frames, wire them together with epsilon edges and push the result.

use tracing::{debug, warn};

use crate::automaton::collapse::collapse_epsilons;
use crate::automaton::graph::{Edge, Graph, NodeId};
use crate::automaton::product::and_product;
use crate::automaton::symbol::{LOOP_LABEL, Operator, SKIP_LABEL};
use crate::category::{Category, CategoryTable, Tolerance};
use crate::error::{ConstellationError, Result};
use crate::expr::Expr;

/// Open boundary of a subgraph under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    entry: NodeId,
    exits: Vec<NodeId>,
}

/// Build the graph for `expr`.
///
/// Categories created by AND products are added to `categories` under their
/// merged labels so later stages can resolve every edge label.
pub fn build_graph(
    expr: &Expr,
    categories: &mut CategoryTable,
    and_tolerance: Tolerance,
) -> Result<Graph> {
    let mut builder = GraphBuilder::new(categories, and_tolerance);
    builder.visit(expr)?;
    builder.finish()
}

pub struct GraphBuilder<'a> {
    graph: Graph,
    stack: Vec<Frame>,
    categories: &'a mut CategoryTable,
    and_tolerance: Tolerance,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(categories: &'a mut CategoryTable, and_tolerance: Tolerance) -> Self {
        Self {
            graph: Graph::new(),
            stack: Vec::new(),
            categories,
            and_tolerance,
        }
    }

    /// Add the subgraph for `expr` and push its frame.
    pub fn visit(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Atom(name) => self.atom(name),
            Expr::Then(a, b) => {
                self.visit(a)?;
                self.visit(b)?;
                self.then()
            }
            Expr::Or(operands) => self.or(operands),
            Expr::And(operands) => self.and(operands),
            Expr::ZeroOrMore(inner) => {
                self.visit(inner)?;
                self.zero_or_more()
            }
            Expr::OneOrMore(inner) => {
                self.visit(inner)?;
                self.one_or_more()
            }
            Expr::ZeroOrOne(inner) => {
                self.visit(inner)?;
                self.zero_or_one()
            }
            Expr::ZeroOrMoreProvisional(_) | Expr::ZeroOrOneProvisional(_) => {
                Err(ConstellationError::Graph(format!(
                    "{expr} is in part-document export form and cannot be compiled"
                )))
            }
        }
    }

    /// Close the graph: exits become accept nodes and the entry becomes the root.
    pub fn finish(mut self) -> Result<Graph> {
        let frame = self.take_single_frame()?;
        for &exit in &frame.exits {
            self.graph.mark_accept(exit)?;
        }
        self.graph.mark_root(frame.entry)?;
        Ok(self.graph)
    }

    fn take_single_frame(&mut self) -> Result<Frame> {
        match (self.stack.pop(), self.stack.is_empty()) {
            (Some(frame), true) => Ok(frame),
            (None, _) => Err(ConstellationError::Graph("nothing was built".to_string())),
            (Some(_), false) => Err(ConstellationError::Graph(format!(
                "{} unconnected subgraphs left after construction",
                self.stack.len() + 1
            ))),
        }
    }

    fn pop(&mut self) -> Result<Frame> {
        self.stack
            .pop()
            .ok_or_else(|| ConstellationError::Graph("operator is missing an operand".to_string()))
    }

    /// Remove every node allocated at or after `bound`.
    fn discard_nodes_from(&mut self, bound: usize) {
        for id in self.graph.node_ids() {
            if id.index() >= bound {
                self.graph.remove_node(id);
            }
        }
    }

    fn atom(&mut self, name: &str) -> Result<()> {
        let head = self.graph.add_epsilon_node();
        let tail = self.graph.add_epsilon_node();
        if let Some(node) = self.graph.node_mut(head) {
            node.label = format!("{name}.head");
        }

        let category = match self.categories.get(name) {
            Some(category) => category.clone(),
            None => {
                // Reported when designs are enumerated.
                warn!(atom = name, "atom has no category");
                Category::new()
            }
        };
        self.graph.add_edge(Edge::atom(head, tail, name, category))?;
        self.stack.push(Frame {
            entry: head,
            exits: vec![tail],
        });
        Ok(())
    }

    fn then(&mut self) -> Result<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        for &exit in a.exits.iter().rev() {
            self.graph.add_edge(Edge::epsilon(exit, b.entry))?;
        }
        self.graph.tag(b.entry, Operator::Then)?;

        let mut exits = b.exits;
        exits.reverse();
        self.stack.push(Frame {
            entry: a.entry,
            exits,
        });
        Ok(())
    }

    fn or(&mut self, operands: &[Expr]) -> Result<()> {
        let parent = self.graph.add_epsilon_node();
        let depth = self.stack.len();
        let mut dropped = None;
        for operand in operands {
            let height = self.stack.len();
            let bound = self.graph.id_bound();
            match self.visit(operand) {
                Ok(()) => {}
                Err(err) if err.is_recoverable() => {
                    debug!(error = %err, %operand, "dropping empty OR branch");
                    self.stack.truncate(height);
                    self.discard_nodes_from(bound);
                    dropped = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        // Every branch was empty.
        if let Some(err) = dropped.filter(|_| self.stack.len() == depth) {
            return Err(err);
        }

        let mut exits = Vec::new();
        for frame in self.stack.split_off(depth).into_iter().rev() {
            self.graph.add_edge(Edge::epsilon(parent, frame.entry))?;
            exits.extend(frame.exits);
        }
        self.graph.tag(parent, Operator::Or)?;
        self.stack.push(Frame {
            entry: parent,
            exits,
        });
        Ok(())
    }

    fn zero_or_more(&mut self) -> Result<()> {
        let a = self.pop()?;
        let tail = self.graph.add_epsilon_node();
        self.graph.add_edge(Edge::epsilon(a.entry, tail))?;
        for &exit in &a.exits {
            self.graph
                .add_edge(Edge::tagged(exit, a.entry, Operator::ZeroOrMore, LOOP_LABEL))?;
        }
        self.graph.tag(a.entry, Operator::ZeroOrMore)?;
        self.stack.push(Frame {
            entry: a.entry,
            exits: vec![tail],
        });
        Ok(())
    }

    fn one_or_more(&mut self) -> Result<()> {
        let a = self.pop()?;
        let looped = a.exits.iter().any(|&exit| {
            self.graph
                .node(exit)
                .is_some_and(|node| node.edges.iter().any(|edge| edge.dest == a.entry))
        });
        // Already loops back, e.g. directly nested one-or-more.
        if looped {
            self.stack.push(a);
            return Ok(());
        }

        for &exit in &a.exits {
            self.graph
                .add_edge(Edge::tagged(exit, a.entry, Operator::OneOrMore, LOOP_LABEL))?;
        }
        self.graph.tag(a.entry, Operator::OneOrMore)?;
        self.stack.push(a);
        Ok(())
    }

    fn zero_or_one(&mut self) -> Result<()> {
        let a = self.pop()?;
        for &exit in &a.exits {
            self.graph
                .add_edge(Edge::tagged(a.entry, exit, Operator::ZeroOrOne, SKIP_LABEL))?;
        }
        self.graph.tag(a.entry, Operator::ZeroOrOne)?;
        self.stack.push(a);
        Ok(())
    }

    /// Build every operand on its own, intersect them and splice the product in.
    fn and(&mut self, operands: &[Expr]) -> Result<()> {
        let tolerance = self.and_tolerance;
        let mut graphs = Vec::with_capacity(operands.len());
        for operand in operands {
            let mut sub = GraphBuilder::new(&mut *self.categories, tolerance);
            sub.visit(operand)?;
            let mut graph = sub.finish()?;
            collapse_epsilons(&mut graph);
            graphs.push(graph);
        }

        let mut graphs = graphs.into_iter();
        let Some(mut product) = graphs.next() else {
            return Err(ConstellationError::Graph("AND has no operands".to_string()));
        };
        let mut merged = CategoryTable::new();
        for (i, next) in graphs.enumerate() {
            let left = if i == 0 { &*self.categories } else { &merged };
            let combined = and_product(&product, left, &next, &*self.categories, tolerance)?;
            product = combined.graph;
            merged.extend(combined.categories);
        }

        let root = product
            .root()
            .ok_or(ConstellationError::EmptyIntersection { tolerance })?;
        let accepts = product.accepts();
        product.demote(root)?;
        for &accept in &accepts {
            product.demote(accept)?;
        }

        let mapping = self.graph.absorb(product);
        let remap = |id: NodeId| mapping.get(&id).copied().unwrap_or(id);
        debug!(
            operands = operands.len(),
            nodes = mapping.len(),
            "spliced AND product"
        );
        self.categories.extend(merged);
        self.stack.push(Frame {
            entry: remap(root),
            exits: accepts.into_iter().map(remap).collect(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::graph::NodeKind;

    fn table() -> CategoryTable {
        [
            ("a".to_string(), Category::from_ids(["a1"])),
            ("b".to_string(), Category::from_ids(["b1", "b2"])),
        ]
        .into_iter()
        .collect()
    }

    fn build(expr: &Expr) -> Graph {
        let mut categories = table();
        build_graph(expr, &mut categories, Tolerance::Strict).unwrap()
    }

    #[test]
    fn test_atom_graph() {
        let graph = build(&Expr::atom("a"));
        assert_eq!(graph.len(), 2);

        let root = graph.root().unwrap();
        let node = graph.node(root).unwrap();
        assert_eq!(node.kind, NodeKind::Root);
        assert_eq!(node.edges.len(), 1);
        assert_eq!(node.edges[0].label, "a");
        assert_eq!(graph.accepts(), vec![node.edges[0].dest]);
    }

    #[test]
    fn test_then_links_exits_to_entry() {
        let graph = build(&Expr::then(Expr::atom("a"), Expr::atom("b")));
        assert_eq!(graph.len(), 4);
        let tagged: Vec<_> = graph
            .nodes()
            .filter(|node| node.has_operator(Operator::Then))
            .collect();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].label, "b.head");
        assert_eq!(graph.accepts().len(), 1);
    }

    #[test]
    fn test_or_branches_from_parent() {
        let graph = build(&Expr::or([Expr::atom("a"), Expr::atom("b")]));
        let root = graph.node(graph.root().unwrap()).unwrap();
        assert!(root.has_operator(Operator::Or));
        assert_eq!(root.edges.len(), 2);
        // Frames are drained last-in first-out.
        let first = graph.node(root.edges[0].dest).unwrap();
        assert_eq!(first.label, "b.head");
        assert_eq!(graph.accepts().len(), 2);
    }

    #[test]
    fn test_zero_or_more_adds_tail_and_back_edge() {
        let graph = build(&Expr::zero_or_more(Expr::atom("a")));
        assert_eq!(graph.len(), 3);
        let root = graph.node(graph.root().unwrap()).unwrap();
        assert!(root.has_operator(Operator::ZeroOrMore));

        let back = graph
            .edges()
            .find(|edge| edge.operator == Operator::ZeroOrMore)
            .unwrap();
        assert_eq!(back.dest, root.id);
        assert_eq!(back.label, LOOP_LABEL);
        let accepts = graph.accepts();
        assert_eq!(accepts.len(), 1);
        assert!(root.edges.iter().any(|edge| edge.dest == accepts[0]));
    }

    #[test]
    fn test_nested_one_or_more_is_not_doubled() {
        let graph = build(&Expr::one_or_more(Expr::one_or_more(Expr::atom("a"))));
        let loops = graph
            .edges()
            .filter(|edge| edge.label == LOOP_LABEL)
            .count();
        assert_eq!(loops, 1);
    }

    #[test]
    fn test_one_or_more_back_edge() {
        let graph = build(&Expr::one_or_more(Expr::atom("a")));
        let root = graph.root().unwrap();
        let back = graph
            .edges()
            .find(|edge| edge.operator == Operator::OneOrMore)
            .unwrap();
        assert_eq!(back.dest, root);
        assert!(graph.node(root).unwrap().has_operator(Operator::OneOrMore));
    }

    #[test]
    fn test_zero_or_one_bypass() {
        let graph = build(&Expr::zero_or_one(Expr::atom("a")));
        let root = graph.node(graph.root().unwrap()).unwrap();
        let skip = root
            .edges
            .iter()
            .find(|edge| edge.operator == Operator::ZeroOrOne)
            .unwrap();
        assert_eq!(skip.label, SKIP_LABEL);
        assert_eq!(graph.accepts(), vec![skip.dest]);
    }

    #[test]
    fn test_undefined_atom_still_builds() {
        let graph = build(&Expr::atom("missing"));
        let edge = graph.edges().next().unwrap();
        assert_eq!(edge.label, "missing");
        assert!(edge.component.category().unwrap().is_empty());
    }

    #[test]
    fn test_and_registers_merged_categories() {
        let mut categories: CategoryTable = [
            ("x".to_string(), Category::from_ids(["p", "q"])),
            ("y".to_string(), Category::from_ids(["q", "r"])),
        ]
        .into_iter()
        .collect();
        let expr = Expr::and([Expr::atom("x"), Expr::atom("y")]);
        let graph = build_graph(&expr, &mut categories, Tolerance::Strict).unwrap();

        let merged = categories.get("x_y").unwrap();
        assert_eq!(merged.ids().iter().collect::<Vec<_>>(), vec!["q"]);
        let labels: Vec<_> = graph
            .edges()
            .filter(|edge| !edge.is_epsilon())
            .map(|edge| edge.label.as_str())
            .collect();
        assert_eq!(labels, vec!["x_y"]);
        assert!(graph.root().is_some());
        assert!(!graph.accepts().is_empty());
    }

    #[test]
    fn test_and_of_disjoint_operands_is_empty() {
        let expr = Expr::and([Expr::atom("a"), Expr::atom("b")]);
        let mut categories = table();
        let err = build_graph(&expr, &mut categories, Tolerance::Strict).unwrap_err();
        assert!(matches!(err, ConstellationError::EmptyIntersection { .. }));
    }

    #[test]
    fn test_or_skips_empty_and_branch() {
        let expr = Expr::or([
            Expr::atom("a"),
            Expr::and([Expr::atom("a"), Expr::atom("b")]),
        ]);
        let graph = build(&expr);

        // Parent plus the two nodes of `a`; nothing left over from the AND.
        assert_eq!(graph.len(), 3);
        let root = graph.node(graph.root().unwrap()).unwrap();
        assert!(root.has_operator(Operator::Or));
        assert_eq!(root.edges.len(), 1);
        let labels: Vec<_> = graph
            .edges()
            .filter(|edge| !edge.is_epsilon())
            .map(|edge| edge.label.as_str())
            .collect();
        assert_eq!(labels, vec!["a"]);
        assert_eq!(graph.accepts().len(), 1);
    }

    #[test]
    fn test_or_of_only_empty_branches_is_empty() {
        let expr = Expr::or([
            Expr::and([Expr::atom("a"), Expr::atom("b")]),
            Expr::and([Expr::atom("b"), Expr::atom("a")]),
        ]);
        let mut categories = table();
        let err = build_graph(&expr, &mut categories, Tolerance::Strict).unwrap_err();
        assert!(matches!(err, ConstellationError::EmptyIntersection { .. }));
    }

    #[test]
    fn test_or_keeps_unrecoverable_errors() {
        let expr = Expr::or([
            Expr::atom("a"),
            Expr::and([Expr::atom("a"), Expr::atom("ghost")]),
        ]);
        let mut categories = table();
        let err = build_graph(&expr, &mut categories, Tolerance::Strict).unwrap_err();
        assert!(matches!(err, ConstellationError::UndefinedCategory(label) if label == "ghost"));
    }

    fn overlapping() -> CategoryTable {
        [
            ("x".to_string(), Category::from_ids(["p", "q"])),
            ("y".to_string(), Category::from_ids(["q", "r"])),
            ("z".to_string(), Category::from_ids(["q", "s"])),
        ]
        .into_iter()
        .collect()
    }

    fn merged_ids<'t>(graph: &Graph, categories: &'t CategoryTable) -> Vec<&'t str> {
        let edge = graph.edges().find(|edge| !edge.is_epsilon()).unwrap();
        categories
            .get(&edge.label)
            .unwrap()
            .ids()
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn test_and_folds_three_operands() {
        let mut categories = overlapping();
        let expr = Expr::and([Expr::atom("x"), Expr::atom("y"), Expr::atom("z")]);
        let graph = build_graph(&expr, &mut categories, Tolerance::Strict).unwrap();

        assert!(categories.contains("x_y"));
        let atoms = graph.edges().filter(|edge| !edge.is_epsilon()).count();
        assert_eq!(atoms, 1);
        assert_eq!(merged_ids(&graph, &categories), vec!["q"]);
    }

    #[test]
    fn test_nested_and_resolves_inner_merge() {
        let mut categories = overlapping();
        let expr = Expr::and([
            Expr::and([Expr::atom("x"), Expr::atom("y")]),
            Expr::atom("z"),
        ]);
        let graph = build_graph(&expr, &mut categories, Tolerance::Strict).unwrap();

        assert!(categories.contains("x_y"));
        assert_eq!(merged_ids(&graph, &categories), vec!["q"]);
    }

    #[test]
    fn test_export_form_is_rejected() {
        let expr = Expr::ZeroOrMoreProvisional(Box::new(Expr::atom("a")));
        let mut categories = table();
        assert!(build_graph(&expr, &mut categories, Tolerance::Strict).is_err());
    }
}
