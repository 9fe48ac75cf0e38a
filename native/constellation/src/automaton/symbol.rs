//! Edge components and operator tags.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::category::Category;

/// Text carried by plain epsilon nodes and edges.
pub const EPSILON_LABEL: &str = "Epsilon";
/// Text carried by the root node.
pub const ROOT_LABEL: &str = "Root";
/// Text carried by accept nodes.
pub const ACCEPT_LABEL: &str = "Accept";
/// Text carried by loop back-edges of `OneOrMore`/`ZeroOrMore`.
pub const LOOP_LABEL: &str = "OrMore";
/// Text carried by the bypass edges of `ZeroOrOne`.
pub const SKIP_LABEL: &str = "Zero";

/// The construction that produced an edge, or the operator whose subgraph a node enters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    Epsilon,
    Atom,
    Then,
    Or,
    And,
    ZeroOrMore,
    OneOrMore,
    ZeroOrOne,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Epsilon => "Epsilon",
            Operator::Atom => "Atom",
            Operator::Then => "Then",
            Operator::Or => "Or",
            Operator::And => "And",
            Operator::ZeroOrMore => "ZeroOrMore",
            Operator::OneOrMore => "OneOrMore",
            Operator::ZeroOrOne => "ZeroOrOne",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an edge consumes: nothing, or one part drawn from a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    Epsilon,
    Part(Category),
}

impl Component {
    #[inline]
    pub fn is_epsilon(&self) -> bool {
        matches!(self, Component::Epsilon)
    }

    pub fn category(&self) -> Option<&Category> {
        match self {
            Component::Epsilon => None,
            Component::Part(category) => Some(category),
        }
    }
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Component::Epsilon => serializer.serialize_str("epsilon"),
            Component::Part(category) => category.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsilon() {
        assert!(Component::Epsilon.is_epsilon());
        assert!(!Component::Part(Category::from_ids(["a1"])).is_epsilon());
        assert!(Component::Epsilon.category().is_none());
    }

    #[test]
    fn test_component_json() {
        let json = serde_json::to_value(Component::Epsilon).unwrap();
        assert_eq!(json, serde_json::json!("epsilon"));
        let json = serde_json::to_value(Component::Part(Category::from_ids(["a1"]))).unwrap();
        assert_eq!(json["ids"], serde_json::json!(["a1"]));
    }
}
