//! Typed values produced by evaluation.
//!
//! A [`TypedValue`] is an immutable snapshot of (rendered text, canonical
//! type, raw value). Registry functions never mutate a bound argument in
//! place; every re-tagging or coercion constructs a fresh value.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::types::ParamType;

/// Per-template metadata parsed from `key=value` directives.
///
/// Keys are lower-cased at extraction time. A `BTreeMap` keeps iteration
/// and serialization deterministic.
pub type Metadata = BTreeMap<String, String>;

/// The type-appropriate raw representation behind a [`TypedValue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawValue {
    Int(BigInt),
    Bytes(Vec<u8>),
    Bool(bool),
    Str(String),
}

impl RawValue {
    /// Short family name used in error messages.
    pub fn family(&self) -> &'static str {
        match self {
            RawValue::Int(_) => "integer",
            RawValue::Bytes(_) => "bytes",
            RawValue::Bool(_) => "boolean",
            RawValue::Str(_) => "string",
        }
    }
}

/// An immutable (text, type, raw value) triple.
///
/// Invariant: `value`'s representation always matches `ty` — integer types
/// hold `RawValue::Int`, byte types hold `RawValue::Bytes`, and so on. The
/// constructors below are the only way the crate builds these, which keeps
/// the invariant local to this module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedValue {
    /// Text as it appears in rendered template output.
    pub text: String,
    /// Canonical type tag.
    pub ty: ParamType,
    /// Raw value matching `ty`.
    pub value: RawValue,
}

impl TypedValue {
    /// An integer value; renders as its decimal string.
    pub fn integer(ty: ParamType, value: BigInt) -> Self {
        debug_assert!(ty.is_integer());
        TypedValue {
            text: value.to_string(),
            ty,
            value: RawValue::Int(value),
        }
    }

    /// A byte value; renders as `0x…` hex.
    pub fn bytes(ty: ParamType, value: Vec<u8>) -> Self {
        TypedValue {
            text: format!("0x{}", hex::encode(&value)),
            ty,
            value: RawValue::Bytes(value),
        }
    }

    /// A boolean; renders as `true`/`false`.
    pub fn boolean(value: bool) -> Self {
        TypedValue {
            text: if value { "true" } else { "false" }.to_string(),
            ty: ParamType::Bool,
            value: RawValue::Bool(value),
        }
    }

    /// A string; renders verbatim.
    pub fn string(value: String) -> Self {
        TypedValue {
            text: value.clone(),
            ty: ParamType::String,
            value: RawValue::Str(value),
        }
    }

    /// The raw integer, or a `TypeMismatch` naming `function`.
    pub fn as_int(&self, function: &str) -> Result<&BigInt, FormatError> {
        match &self.value {
            RawValue::Int(v) => Ok(v),
            _ => Err(self.type_mismatch(function, "integer")),
        }
    }

    /// The raw bytes, or a `TypeMismatch` naming `function`.
    pub fn as_bytes(&self, function: &str) -> Result<&[u8], FormatError> {
        match &self.value {
            RawValue::Bytes(v) => Ok(v),
            _ => Err(self.type_mismatch(function, "bytes")),
        }
    }

    /// The raw string, or a `TypeMismatch` naming `function`.
    pub fn as_str(&self, function: &str) -> Result<&str, FormatError> {
        match &self.value {
            RawValue::Str(v) => Ok(v),
            _ => Err(self.type_mismatch(function, "string")),
        }
    }

    fn type_mismatch(&self, function: &str, expected: &str) -> FormatError {
        FormatError::TypeMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: self.ty.canonical_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn test_integer_renders_decimal() {
        let v = TypedValue::integer(ParamType::Int(256), BigInt::from(-42));
        assert_eq!(v.text, "-42");
        assert_eq!(v.ty, ParamType::Int(256));
    }

    #[test]
    fn test_bytes_render_hex() {
        let v = TypedValue::bytes(ParamType::FixedBytes(2), vec![0xab, 0xcd]);
        assert_eq!(v.text, "0xabcd");
    }

    #[test]
    fn test_boolean_text() {
        assert_eq!(TypedValue::boolean(true).text, "true");
        assert_eq!(TypedValue::boolean(false).text, "false");
    }

    #[test]
    fn test_accessors_report_function() {
        let v = TypedValue::string("hi".to_string());
        let err = v.as_bytes("keccak256").unwrap_err();
        assert_eq!(
            err,
            FormatError::TypeMismatch {
                function: "keccak256".to_string(),
                expected: "bytes".to_string(),
                actual: "string".to_string(),
            }
        );
    }
}
