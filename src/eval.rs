//! Expression evaluation.
//!
//! `evaluate` is a pure function of (node, bound arguments, metadata);
//! identical inputs always yield an identical value or an identical
//! failure. Independent evaluations share only the read-only function
//! registry and may run concurrently.

use crate::ast::{Literal, Node};
use crate::error::{FormatError, FormatResult};
use crate::functions;
use crate::types::ParamType;
use crate::value::{Metadata, TypedValue};

/// Evaluate one expression node against the bound arguments and the
/// enclosing template's metadata.
///
/// Substitution nodes evaluate their inner expressions strictly left to
/// right and keep only the last result; the earlier expressions are
/// inline assertions whose only observable effect is failure. The first
/// failure aborts the whole chain.
pub fn evaluate(node: &Node, args: &[TypedValue], metadata: &Metadata) -> FormatResult<TypedValue> {
    match node {
        Node::Literal(Literal::Bool(value)) => Ok(TypedValue::boolean(*value)),
        Node::Literal(Literal::Bytes(data)) => {
            Ok(TypedValue::bytes(ParamType::Bytes, data.clone()))
        }
        // Number literals always default to a signed 256-bit integer.
        Node::Literal(Literal::Number(value)) => {
            Ok(TypedValue::integer(ParamType::Int(256), value.clone()))
        }
        Node::Literal(Literal::Str(value)) => Ok(TypedValue::string(value.clone())),
        Node::Call { name, params } => {
            let builtin = functions::lookup(name)
                .ok_or_else(|| FormatError::UnknownFunction(name.clone()))?;
            functions::invoke(builtin, name, params, args, metadata)
        }
        Node::Substitution(exprs) => {
            let mut last = None;
            for expr in exprs {
                last = Some(evaluate(expr, args, metadata)?);
            }
            last.ok_or_else(|| FormatError::Parse("empty substitution".to_string()))
        }
    }
}
