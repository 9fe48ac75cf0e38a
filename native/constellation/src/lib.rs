//! GOLDBAR design-space compiler.
//!
//! An expression tree over parts (`Then`, `Or`, `And`, `OneOrMore`,
//! `ZeroOrMore`, `ZeroOrOne`, `Atom`) is simplified, built into an
//! edge-labelled automaton, collapsed, walked for accepting paths, and the
//! paths are expanded into concrete part sequences using a category table.

pub mod automaton;
pub mod category;
pub mod designs;
pub mod error;
pub mod expr;
pub mod options;
pub mod paths;
pub mod simplify;

#[cfg(feature = "python")]
pub mod python_bindings;

use serde::Serialize;
use tracing::{debug, trace};

pub use crate::automaton::{Graph, NodeCentricGraph, build_graph, collapse_epsilons};
pub use crate::category::{Category, CategoryTable, Tolerance, parse_categories};
pub use crate::designs::{Design, cartesian_product, enumerate_designs};
pub use crate::error::{ConstellationError, Result};
pub use crate::expr::{Expr, parse_expression};
pub use crate::options::{CompileOptions, NumDesigns, Representation};
pub use crate::paths::{Path, enumerate_paths};
pub use crate::simplify::{simplify, to_provisional_form};

/// Everything a compilation produces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    #[serde(rename = "stateGraph")]
    pub graph: Graph,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_centric: Option<NodeCentricGraph>,
    pub designs: Vec<Design>,
    pub paths: Vec<Path>,
    /// The input table plus every category registered by AND products.
    pub categories: CategoryTable,
    /// Messages for conditions that emptied the result without failing it.
    pub errors: Vec<String>,
}

impl CompileOutput {
    /// The empty result returned when the design space has no members.
    pub fn placeholder(categories: CategoryTable, reason: &ConstellationError) -> Self {
        Self {
            graph: Graph::placeholder(),
            node_centric: None,
            designs: Vec::new(),
            paths: Vec::new(),
            categories,
            errors: vec![reason.to_string()],
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Compile `expr` against `categories`.
///
/// An empty AND intersection or a graph with nothing to enumerate is not an
/// error: the result is [`CompileOutput::placeholder`] with the reason in
/// `errors`. Everything else is returned as `Err`.
pub fn compile(
    expr: &Expr,
    categories: &CategoryTable,
    options: &CompileOptions,
) -> Result<CompileOutput> {
    options.validate()?;

    let simplified = simplify(expr);
    trace!(%expr, %simplified, "simplified expression");

    let mut categories = categories.clone();
    match compile_simplified(&simplified, &mut categories, options) {
        Ok(output) => Ok(output),
        Err(err) if err.is_recoverable() => {
            debug!(error = %err, "design space is empty");
            Ok(CompileOutput::placeholder(categories, &err))
        }
        Err(err) => Err(err),
    }
}

/// Parse both documents and [`compile`] them.
pub fn compile_json(
    expression: &str,
    categories: &str,
    options: &CompileOptions,
) -> Result<CompileOutput> {
    let expr = parse_expression(expression)?;
    let categories = parse_categories(categories)?;
    compile(&expr, &categories, options)
}

fn compile_simplified(
    expr: &Expr,
    categories: &mut CategoryTable,
    options: &CompileOptions,
) -> Result<CompileOutput> {
    let mut graph = build_graph(expr, categories, options.and_tolerance)?;
    let collapsed = collapse_epsilons(&mut graph);
    trace!(collapsed, nodes = graph.len(), "collapsed graph");

    let paths = enumerate_paths(&graph, options.max_cycles)?;
    let designs = enumerate_designs(&paths, categories, options.num_designs)?;
    let node_centric = match options.representation {
        Representation::NodeCentric => Some(NodeCentricGraph::from_graph(&graph)?),
        Representation::EdgeCentric => None,
    };
    debug!(
        nodes = graph.len(),
        paths = paths.len(),
        designs = designs.len(),
        "compiled"
    );

    Ok(CompileOutput {
        graph,
        node_centric,
        designs,
        paths,
        categories: categories.clone(),
        errors: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CategoryTable {
        [
            ("a".to_string(), Category::from_ids(["a1"])),
            ("b".to_string(), Category::from_ids(["b1", "b2"])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_compile_sequence() {
        let expr = Expr::then(Expr::atom("a"), Expr::atom("b"));
        let options = CompileOptions::default().with_num_designs(NumDesigns::Limit(10));
        let output = compile(&expr, &table(), &options).unwrap();

        assert_eq!(
            output.designs,
            vec![
                vec!["a1".to_string(), "b1".to_string()],
                vec!["a1".to_string(), "b2".to_string()],
            ]
        );
        assert_eq!(output.paths.len(), 1);
        assert!(output.errors.is_empty());
        assert!(output.node_centric.is_none());
    }

    #[test]
    fn test_compile_empty_and_is_placeholder() {
        let expr = Expr::and([Expr::atom("a"), Expr::atom("b")]);
        let output = compile(&expr, &table(), &CompileOptions::default()).unwrap();

        assert_eq!(output.graph, Graph::placeholder());
        assert!(output.designs.is_empty());
        assert!(output.paths.is_empty());
        assert_eq!(output.errors.len(), 1);
    }

    #[test]
    fn test_compile_rejects_bad_options_first() {
        let expr = Expr::atom("undefined");
        let options = CompileOptions::default().with_max_cycles(42);
        let err = compile(&expr, &table(), &options).unwrap_err();
        assert!(matches!(err, ConstellationError::InvalidParameter(_)));
    }

    #[test]
    fn test_compile_node_centric() {
        let expr = Expr::atom("a");
        let options = CompileOptions::default().with_representation(Representation::NodeCentric);
        let output = compile(&expr, &table(), &options).unwrap();
        assert_eq!(output.node_centric.map(|view| view.len()), Some(3));
    }
}
