//! Argument normalization.
//!
//! Turns the caller's declared argument types and raw string values into
//! positional [`TypedValue`]s, keeping the `skip:` tag alongside the
//! canonical declaration for later payload decisions.

use num_bigint::BigInt;

use crate::error::{FormatError, FormatResult};
use crate::types::{ArgType, ParamType};
use crate::value::TypedValue;

/// Normalize declarations and raw values, matched by position.
pub fn normalize_args(
    arg_types: &[impl AsRef<str>],
    args: &[impl AsRef<str>],
) -> FormatResult<(Vec<ArgType>, Vec<TypedValue>)> {
    if arg_types.len() != args.len() {
        return Err(FormatError::ArityMismatch {
            function: "build".to_string(),
            expected: arg_types.len(),
            actual: args.len(),
        });
    }

    let mut declarations = Vec::with_capacity(arg_types.len());
    let mut values = Vec::with_capacity(args.len());
    for (position, (decl, raw)) in arg_types.iter().zip(args).enumerate() {
        let decl = ArgType::parse(decl.as_ref(), position)?;
        values.push(normalize_one(&decl.ty, raw.as_ref(), position)?);
        declarations.push(decl);
    }
    Ok((declarations, values))
}

fn normalize_one(ty: &ParamType, raw: &str, position: usize) -> FormatResult<TypedValue> {
    match ty {
        ParamType::Int(_) | ParamType::Uint(_) => {
            Ok(TypedValue::integer(*ty, parse_big_int(raw, position)?))
        }
        ParamType::Bool => Ok(TypedValue::boolean(raw == "true")),
        ParamType::String => Ok(TypedValue::string(raw.to_string())),
        ParamType::Bytes => Ok(TypedValue::bytes(*ty, parse_hex(raw)?)),
        ParamType::FixedBytes(len) => {
            let data = parse_hex(raw)?;
            if data.len() != *len as usize {
                return Err(FormatError::LengthMismatch {
                    context: format!("argument {}", position + 1),
                    expected: *len as usize,
                    actual: data.len(),
                });
            }
            Ok(TypedValue::bytes(*ty, data))
        }
        // The template side knows address values; declared arguments do not.
        ParamType::Address => Err(FormatError::UnsupportedType {
            ty: ty.canonical_name(),
            position,
        }),
    }
}

/// Parse a raw integer value: decimal or `0x`-hex, optional leading `-`.
fn parse_big_int(raw: &str, position: usize) -> FormatResult<BigInt> {
    let invalid = || FormatError::InvalidNumber {
        value: raw.to_string(),
        context: format!("argument {}", position + 1),
    };
    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let magnitude = match body.strip_prefix("0x") {
        Some(hex_digits) => BigInt::parse_bytes(hex_digits.as_bytes(), 16),
        None => BigInt::parse_bytes(body.as_bytes(), 10),
    }
    .ok_or_else(invalid)?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn parse_hex(raw: &str) -> FormatResult<Vec<u8>> {
    let invalid = || FormatError::InvalidHex {
        value: raw.to_string(),
    };
    let digits = raw.strip_prefix("0x").ok_or_else(invalid)?;
    hex::decode(digits).map_err(|_| invalid())
}
