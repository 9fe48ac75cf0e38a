//! GOLDBAR expression trees.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConstellationError, Result};

/// A parsed GOLDBAR expression.
///
/// The wire form is the grammar parser's externally tagged JSON, e.g.
/// `{"Then":[{"Atom":["promoter"]},{"Atom":["cds"]}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawExpr", into = "RawExpr")]
pub enum Expr {
    Atom(String),
    Then(Box<Expr>, Box<Expr>),
    Or(Vec<Expr>),
    And(Vec<Expr>),
    OneOrMore(Box<Expr>),
    ZeroOrMore(Box<Expr>),
    ZeroOrOne(Box<Expr>),
    /// `ZeroOrMore` relabelled for part-document export.
    ZeroOrMoreProvisional(Box<Expr>),
    /// `ZeroOrOne` relabelled for part-document export.
    ZeroOrOneProvisional(Box<Expr>),
}

impl Expr {
    pub fn atom(name: impl Into<String>) -> Self {
        Expr::Atom(name.into())
    }

    pub fn then(first: Expr, second: Expr) -> Self {
        Expr::Then(Box::new(first), Box::new(second))
    }

    pub fn or(operands: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Or(operands.into_iter().collect())
    }

    pub fn and(operands: impl IntoIterator<Item = Expr>) -> Self {
        Expr::And(operands.into_iter().collect())
    }

    pub fn one_or_more(inner: Expr) -> Self {
        Expr::OneOrMore(Box::new(inner))
    }

    pub fn zero_or_more(inner: Expr) -> Self {
        Expr::ZeroOrMore(Box::new(inner))
    }

    pub fn zero_or_one(inner: Expr) -> Self {
        Expr::ZeroOrOne(Box::new(inner))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, operands: &[Expr], keyword: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    write!(f, " {keyword} ")?;
                }
                write!(f, "{operand}")?;
            }
            f.write_str(")")
        }

        match self {
            Expr::Atom(name) => f.write_str(name),
            Expr::Then(a, b) => write!(f, "({a} then {b})"),
            Expr::Or(operands) => join(f, operands, "or"),
            Expr::And(operands) => join(f, operands, "and"),
            Expr::OneOrMore(a) => write!(f, "one-or-more {a}"),
            Expr::ZeroOrMore(a) | Expr::ZeroOrMoreProvisional(a) => write!(f, "zero-or-more {a}"),
            Expr::ZeroOrOne(a) | Expr::ZeroOrOneProvisional(a) => write!(f, "zero-or-one {a}"),
        }
    }
}

/// Parse the grammar parser's JSON output.
pub fn parse_expression(text: &str) -> Result<Expr> {
    Ok(serde_json::from_str(text)?)
}

#[derive(Serialize, Deserialize)]
enum RawExpr {
    Atom(Vec<String>),
    Then(Vec<RawExpr>),
    Or(Vec<RawExpr>),
    And(Vec<RawExpr>),
    OneOrMore(Vec<RawExpr>),
    ZeroOrMore(Vec<RawExpr>),
    ZeroOrOne(Vec<RawExpr>),
    #[serde(rename = "ZeroOrMoreSBOL")]
    ZeroOrMoreProvisional(Vec<RawExpr>),
    #[serde(rename = "ZeroOrOneSBOL")]
    ZeroOrOneProvisional(Vec<RawExpr>),
}

fn arity(tag: &str, expected: &str, got: usize) -> ConstellationError {
    ConstellationError::Parse(format!("{tag} takes {expected} operand(s), got {got}"))
}

fn unary(tag: &str, operands: Vec<RawExpr>) -> Result<Box<Expr>> {
    let got = operands.len();
    let mut operands = operands.into_iter();
    match (operands.next(), operands.next()) {
        (Some(inner), None) => Ok(Box::new(Expr::try_from(inner)?)),
        _ => Err(arity(tag, "1", got)),
    }
}

fn nary(tag: &str, operands: Vec<RawExpr>) -> Result<Vec<Expr>> {
    if operands.is_empty() {
        return Err(arity(tag, "at least 1", 0));
    }
    operands.into_iter().map(Expr::try_from).collect()
}

impl TryFrom<RawExpr> for Expr {
    type Error = ConstellationError;

    fn try_from(raw: RawExpr) -> Result<Self> {
        Ok(match raw {
            RawExpr::Atom(names) => {
                let got = names.len();
                let mut names = names.into_iter();
                match (names.next(), names.next()) {
                    (Some(name), None) => Expr::Atom(name),
                    _ => return Err(arity("Atom", "1", got)),
                }
            }
            RawExpr::Then(operands) => {
                let got = operands.len();
                let mut operands = operands.into_iter();
                match (operands.next(), operands.next(), operands.next()) {
                    (Some(a), Some(b), None) => Expr::then(Expr::try_from(a)?, Expr::try_from(b)?),
                    _ => return Err(arity("Then", "2", got)),
                }
            }
            RawExpr::Or(operands) => Expr::Or(nary("Or", operands)?),
            RawExpr::And(operands) => Expr::And(nary("And", operands)?),
            RawExpr::OneOrMore(operands) => Expr::OneOrMore(unary("OneOrMore", operands)?),
            RawExpr::ZeroOrMore(operands) => Expr::ZeroOrMore(unary("ZeroOrMore", operands)?),
            RawExpr::ZeroOrOne(operands) => Expr::ZeroOrOne(unary("ZeroOrOne", operands)?),
            RawExpr::ZeroOrMoreProvisional(operands) => {
                Expr::ZeroOrMoreProvisional(unary("ZeroOrMoreSBOL", operands)?)
            }
            RawExpr::ZeroOrOneProvisional(operands) => {
                Expr::ZeroOrOneProvisional(unary("ZeroOrOneSBOL", operands)?)
            }
        })
    }
}

impl From<Expr> for RawExpr {
    fn from(expr: Expr) -> Self {
        let one = |inner: Box<Expr>| -> Vec<RawExpr> { vec![RawExpr::from(*inner)] };
        let many = |operands: Vec<Expr>| -> Vec<RawExpr> {
            operands.into_iter().map(RawExpr::from).collect()
        };
        match expr {
            Expr::Atom(name) => RawExpr::Atom(vec![name]),
            Expr::Then(a, b) => RawExpr::Then(vec![RawExpr::from(*a), RawExpr::from(*b)]),
            Expr::Or(operands) => RawExpr::Or(many(operands)),
            Expr::And(operands) => RawExpr::And(many(operands)),
            Expr::OneOrMore(inner) => RawExpr::OneOrMore(one(inner)),
            Expr::ZeroOrMore(inner) => RawExpr::ZeroOrMore(one(inner)),
            Expr::ZeroOrOne(inner) => RawExpr::ZeroOrOne(one(inner)),
            Expr::ZeroOrMoreProvisional(inner) => RawExpr::ZeroOrMoreProvisional(one(inner)),
            Expr::ZeroOrOneProvisional(inner) => RawExpr::ZeroOrOneProvisional(one(inner)),
        }
    }
}
