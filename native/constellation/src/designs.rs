//! Expanding accepting paths into concrete part sequences.

use indexmap::IndexSet;
use tracing::debug;

use crate::category::CategoryTable;
use crate::error::{ConstellationError, Result};
use crate::options::NumDesigns;
use crate::paths::Path;

/// One concrete sequence of part identifiers.
pub type Design = Vec<String>;

/// Juxtapose every design of `left` with every design of `right`, left-major.
///
/// An empty side leaves the other unchanged.
pub fn cartesian_product(left: &[Design], right: &[Design]) -> Vec<Design> {
    if left.is_empty() {
        return right.to_vec();
    }
    if right.is_empty() {
        return left.to_vec();
    }

    let mut product = Vec::with_capacity(left.len() * right.len());
    for l in left {
        for r in right {
            let mut design = Vec::with_capacity(l.len() + r.len());
            design.extend(l.iter().cloned());
            design.extend(r.iter().cloned());
            product.push(design);
        }
    }
    product
}

/// Every design accepted along `paths`, deduplicated and capped at `limit`.
///
/// Fails with [`ConstellationError::UndefinedCategory`] if any edge label is
/// missing from `categories`. A defined but empty category is not an error: it
/// is skipped at the start of a path and empties the path anywhere after.
pub fn enumerate_designs(
    paths: &[Path],
    categories: &CategoryTable,
    limit: NumDesigns,
) -> Result<Vec<Design>> {
    if limit == NumDesigns::Limit(0) {
        return Ok(Vec::new());
    }

    let mut designs: IndexSet<Design> = IndexSet::new();
    for path in paths {
        designs.extend(path_designs(path, categories)?);
    }

    let found = designs.len();
    let mut designs: Vec<Design> = designs.into_iter().collect();
    if let NumDesigns::Limit(max) = limit {
        designs.truncate(max);
    }
    debug!(paths = paths.len(), found, kept = designs.len(), "enumerated designs");
    Ok(designs)
}

fn path_designs(path: &Path, categories: &CategoryTable) -> Result<Vec<Design>> {
    let mut operands = Vec::with_capacity(path.len());
    for edge in path.edges() {
        let category = categories
            .get(&edge.label)
            .ok_or_else(|| ConstellationError::UndefinedCategory(edge.label.clone()))?;
        let operand: Vec<Design> = category.ids().iter().map(|id| vec![id.clone()]).collect();
        operands.push(operand);
    }

    let mut acc: Vec<Design> = Vec::new();
    for operand in operands {
        if acc.is_empty() {
            acc = operand;
        } else if operand.is_empty() {
            return Ok(Vec::new());
        } else {
            acc = cartesian_product(&acc, &operand);
        }
    }
    Ok(acc)
}
