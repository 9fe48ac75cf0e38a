//! Compilation options.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::category::Tolerance;
use crate::error::{ConstellationError, Result};

/// Largest accepted `max_cycles`.
pub const MAX_CYCLES_LIMIT: u32 = 10;

pub const DEFAULT_NUM_DESIGNS: usize = 100;

/// How many designs to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawNumDesigns", into = "RawNumDesigns")]
pub enum NumDesigns {
    Limit(usize),
    All,
}

impl Default for NumDesigns {
    fn default() -> Self {
        NumDesigns::Limit(DEFAULT_NUM_DESIGNS)
    }
}

impl fmt::Display for NumDesigns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumDesigns::Limit(n) => write!(f, "{n}"),
            NumDesigns::All => f.write_str("all"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawNumDesigns {
    Count(usize),
    Keyword(String),
}

impl TryFrom<RawNumDesigns> for NumDesigns {
    type Error = ConstellationError;

    fn try_from(raw: RawNumDesigns) -> Result<Self> {
        match raw {
            RawNumDesigns::Count(n) => Ok(NumDesigns::Limit(n)),
            RawNumDesigns::Keyword(word) if word.eq_ignore_ascii_case("all") => Ok(NumDesigns::All),
            RawNumDesigns::Keyword(word) => Err(ConstellationError::InvalidParameter(format!(
                "numDesigns must be a positive integer or \"all\", got {word:?}"
            ))),
        }
    }
}

impl From<NumDesigns> for RawNumDesigns {
    fn from(value: NumDesigns) -> Self {
        match value {
            NumDesigns::Limit(n) => RawNumDesigns::Count(n),
            NumDesigns::All => RawNumDesigns::Keyword("all".to_string()),
        }
    }
}

/// Which graph shape to hand back alongside the designs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Representation {
    /// Parts as nodes, required for part-document export.
    NodeCentric,
    /// Parts as edge annotations.
    #[default]
    EdgeCentric,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    pub num_designs: NumDesigns,
    pub max_cycles: u32,
    pub representation: Representation,
    pub and_tolerance: Tolerance,
    /// Accepted and range-checked; no operator merges graphs yet.
    pub merge_tolerance: Tolerance,
}

impl CompileOptions {
    pub fn with_num_designs(mut self, num_designs: NumDesigns) -> Self {
        self.num_designs = num_designs;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    pub fn with_and_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.and_tolerance = tolerance;
        self
    }

    /// Reject out-of-range values before any graph work starts.
    pub fn validate(&self) -> Result<()> {
        if self.num_designs == NumDesigns::Limit(0) {
            return Err(ConstellationError::InvalidParameter(
                "numDesigns must be at least 1".to_string(),
            ));
        }
        if self.max_cycles > MAX_CYCLES_LIMIT {
            return Err(ConstellationError::InvalidParameter(format!(
                "maxCycles must be between 0 and {MAX_CYCLES_LIMIT}, got {}",
                self.max_cycles
            )));
        }
        Ok(())
    }

    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| ConstellationError::InvalidParameter(err.to_string()))
    }
}
