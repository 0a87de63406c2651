//! Expression trees and template fragments.
//!
//! The parser builds these once per template; the evaluator consumes them
//! read-only. A substitution fragment always wraps a
//! [`Node::Substitution`], whose inner expressions are evaluated strictly
//! left to right with only the last result kept (the earlier expressions
//! are inline assertions).

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// A terminal literal inside a template expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    /// `true` / `false`
    Bool(bool),
    /// `0x…` hex data
    Bytes(Vec<u8>),
    /// Decimal integer, arbitrary precision; evaluates as `int256`
    Number(BigInt),
    /// `"…"` quoted string
    Str(String),
}

/// One node of an expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Literal(Literal),
    /// `name(param, …)`
    Call { name: String, params: Vec<Node> },
    /// The comma-separated expression chain of a `${ … }` substitution
    Substitution(Vec<Node>),
}

impl Node {
    /// Convenience constructor for call nodes.
    pub fn call(name: impl Into<String>, params: Vec<Node>) -> Self {
        Node::Call {
            name: name.into(),
            params,
        }
    }
}

/// One fragment of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fragment {
    /// Literal text, plus any `\m{…}` metadata directives that appeared
    /// inside it (directive content is kept raw; the builder validates
    /// `key=value` shape and key uniqueness).
    Text {
        text: String,
        directives: Vec<String>,
    },
    /// A `${ … }` substitution; always a [`Node::Substitution`].
    Substitution(Node),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_constructor() {
        let node = Node::call("atIndex", vec![Node::Literal(Literal::Number(1.into()))]);
        match node {
            Node::Call { name, params } => {
                assert_eq!(name, "atIndex");
                assert_eq!(params.len(), 1);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }
}
