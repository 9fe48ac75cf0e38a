//! PyO3 bindings.
//!
//! Exposes a single JSON-in, JSON-out `compile` function so front ends can
//! drive the compiler without mirroring its types in Python.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::options::CompileOptions;

fn to_py_err(err: crate::ConstellationError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Compile a GOLDBAR expression tree against a categories document.
///
/// `expression` is the grammar parser's JSON, `categories` the categories
/// document and `options` an optional JSON object of compile options. Returns
/// the compile output as JSON.
#[pyfunction]
#[pyo3(name = "compile", signature = (expression, categories, options = None))]
fn py_compile(expression: &str, categories: &str, options: Option<&str>) -> PyResult<String> {
    let options = match options {
        Some(text) => CompileOptions::from_json(text).map_err(to_py_err)?,
        None => CompileOptions::default(),
    };
    let output = crate::compile_json(expression, categories, &options).map_err(to_py_err)?;
    output.to_json().map_err(to_py_err)
}

/// Simplify an expression tree, returned as JSON in the same tagged form.
#[pyfunction]
fn simplify(expression: &str) -> PyResult<String> {
    let expr = crate::parse_expression(expression).map_err(to_py_err)?;
    serde_json::to_string(&crate::simplify(&expr)).map_err(|err| PyValueError::new_err(err.to_string()))
}

#[pymodule]
pub fn constellation(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_compile, m)?)?;
    m.add_function(wrap_pyfunction!(simplify, m)?)?;
    Ok(())
}
