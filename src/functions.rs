//! The built-in function registry.
//!
//! A closed, immutable name -> [`Builtin`] table constructed once at
//! startup and shared read-only across all evaluations. The generated
//! `intN`/`uintN`/`bytesN` families are registered by a factory loop, not
//! by runtime name construction. Every entry checks its parameter count
//! before evaluating any operand, and every entry returns a freshly
//! constructed [`TypedValue`] — bound arguments are never mutated.

use std::collections::HashMap;

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;

use crate::ast::Node;
use crate::crypto;
use crate::error::{FormatError, FormatResult};
use crate::eval::evaluate;
use crate::types::ParamType;
use crate::value::{Metadata, RawValue, TypedValue};

/// One built-in implementation. The width-parameterized variants cover the
/// generated `intN`/`uintN`/`bytesN` families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    AtIndex,
    Equals,
    Address,
    Bytes,
    Int { width: u16, signed: bool },
    FixedBytes(u8),
    FormatUnits,
    Quote,
    Id,
    Keccak256,
    Sha256,
    Namehash,
    Sighash,
    Topichash,
}

static REGISTRY: Lazy<HashMap<String, Builtin>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert("atIndex".to_string(), Builtin::AtIndex);
    table.insert("equals".to_string(), Builtin::Equals);
    table.insert("address".to_string(), Builtin::Address);
    table.insert("bytes".to_string(), Builtin::Bytes);
    table.insert("formatUnits".to_string(), Builtin::FormatUnits);
    table.insert("quote".to_string(), Builtin::Quote);
    table.insert("id".to_string(), Builtin::Id);
    table.insert("keccak256".to_string(), Builtin::Keccak256);
    table.insert("sha256".to_string(), Builtin::Sha256);
    table.insert("namehash".to_string(), Builtin::Namehash);
    table.insert("sighash".to_string(), Builtin::Sighash);
    table.insert("topichash".to_string(), Builtin::Topichash);

    for width in (8..=256u16).step_by(8) {
        table.insert(format!("int{}", width), Builtin::Int { width, signed: true });
        table.insert(
            format!("uint{}", width),
            Builtin::Int {
                width,
                signed: false,
            },
        );
    }
    table.insert(
        "int".to_string(),
        Builtin::Int {
            width: 256,
            signed: true,
        },
    );
    table.insert(
        "uint".to_string(),
        Builtin::Int {
            width: 256,
            signed: false,
        },
    );

    for len in 1..=32u8 {
        table.insert(format!("bytes{}", len), Builtin::FixedBytes(len));
    }

    table
});

/// Look up a built-in by name.
pub fn lookup(name: &str) -> Option<Builtin> {
    REGISTRY.get(name).copied()
}

/// Invoke a built-in. `name` is the name it was called by, used in error
/// reporting (the alias `uint` reports as `uint`, not `uint256`).
pub fn invoke(
    builtin: Builtin,
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    match builtin {
        Builtin::AtIndex => at_index(name, params, args, metadata),
        Builtin::Equals => equals(name, params, args, metadata),
        Builtin::Address => address(name, params, args, metadata),
        Builtin::Bytes => to_bytes(name, params, args, metadata),
        Builtin::Int { width, signed } => retag_int(name, width, signed, params, args, metadata),
        Builtin::FixedBytes(len) => retag_bytes(name, len, params, args, metadata),
        Builtin::FormatUnits => format_units_fn(name, params, args, metadata),
        Builtin::Quote => quote(name, params, args, metadata),
        Builtin::Id => id_fn(name, params, args, metadata),
        Builtin::Keccak256 => keccak256_fn(name, params, args, metadata),
        Builtin::Sha256 => sha256_fn(name, params, args, metadata),
        Builtin::Namehash => namehash_fn(name, params, args, metadata),
        Builtin::Sighash => sighash_fn(name, params, args, metadata),
        Builtin::Topichash => topichash_fn(name, params, args, metadata),
    }
}

// ============================================================================
// Index and comparison
// ============================================================================

fn at_index(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    FormatError::check_arity(name, 1, params.len())?;
    let index_value = evaluate(&params[0], args, metadata)?;
    let index = index_value.as_int(name)?;

    let out_of_range = || FormatError::IndexOutOfRange {
        function: name.to_string(),
        index: index.to_string(),
        count: args.len(),
    };

    // 1-based in templates, 0-based here.
    let zero_based = index - BigInt::from(1);
    if zero_based.sign() == Sign::Minus {
        return Err(out_of_range());
    }
    let position = zero_based.to_usize().ok_or_else(out_of_range)?;
    args.get(position).cloned().ok_or_else(out_of_range)
}

fn equals(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    FormatError::check_arity(name, 2, params.len())?;
    let left = evaluate(&params[0], args, metadata)?;
    let right = evaluate(&params[1], args, metadata)?;
    if left.ty != right.ty {
        return Err(FormatError::TypeMismatch {
            function: name.to_string(),
            expected: left.ty.canonical_name(),
            actual: right.ty.canonical_name(),
        });
    }
    if left.value != right.value {
        return Err(FormatError::ValueMismatch {
            left: left.text,
            right: right.text,
        });
    }
    // The failure above is the point; the value is a placeholder.
    Ok(TypedValue::boolean(true))
}

// ============================================================================
// Coercion
// ============================================================================

fn address(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    FormatError::check_arity(name, 1, params.len())?;
    let value = evaluate(&params[0], args, metadata)?;
    let (checksummed, raw) = crypto::checksum_address(&value.text)?;
    Ok(TypedValue {
        text: checksummed,
        ty: ParamType::Address,
        value: RawValue::Bytes(raw.to_vec()),
    })
}

fn to_bytes(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    FormatError::check_arity(name, 1, params.len())?;
    let value = evaluate(&params[0], args, metadata)?;
    match value.ty {
        ParamType::Bytes => Ok(value),
        // Re-tag only; the rendered text stays as it was.
        ParamType::Address | ParamType::FixedBytes(_) => Ok(TypedValue {
            text: value.text,
            ty: ParamType::Bytes,
            value: value.value,
        }),
        ParamType::String => {
            let data = value.as_str(name)?.as_bytes().to_vec();
            Ok(TypedValue::bytes(ParamType::Bytes, data))
        }
        other => Err(FormatError::UnsupportedConversion {
            function: name.to_string(),
            from: other.canonical_name(),
        }),
    }
}

fn retag_int(
    name: &str,
    width: u16,
    signed: bool,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    FormatError::check_arity(name, 1, params.len())?;
    let value = evaluate(&params[0], args, metadata)?;
    if !value.ty.is_integer() {
        return Err(FormatError::UnsupportedConversion {
            function: name.to_string(),
            from: value.ty.canonical_name(),
        });
    }
    // Pure annotation for later packing; the numeric range is not
    // re-checked here.
    let ty = if signed {
        ParamType::Int(width)
    } else {
        ParamType::Uint(width)
    };
    Ok(TypedValue {
        text: value.text,
        ty,
        value: value.value,
    })
}

fn retag_bytes(
    name: &str,
    len: u8,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    FormatError::check_arity(name, 1, params.len())?;
    let value = evaluate(&params[0], args, metadata)?;
    if value.ty != ParamType::Bytes {
        return Err(FormatError::UnsupportedConversion {
            function: name.to_string(),
            from: value.ty.canonical_name(),
        });
    }
    let data = value.as_bytes(name)?;
    if data.len() != len as usize {
        return Err(FormatError::LengthMismatch {
            context: name.to_string(),
            expected: len as usize,
            actual: data.len(),
        });
    }
    Ok(TypedValue {
        text: value.text.clone(),
        ty: ParamType::FixedBytes(len),
        value: value.value,
    })
}

// ============================================================================
// Formatting
// ============================================================================

fn format_units_fn(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    FormatError::check_arity(name, 2, params.len())?;
    let value = evaluate(&params[0], args, metadata)?;
    let decimals_value = evaluate(&params[1], args, metadata)?;

    let raw = value.as_int(name)?;
    let decimals = decimals_value
        .as_int(name)?
        .to_u32()
        .ok_or_else(|| FormatError::InvalidNumber {
            value: decimals_value.text.clone(),
            context: "formatUnits DECIMALS".to_string(),
        })?;

    let mut text = format_units(raw, decimals);
    if metadata.get("locale").map(String::as_str) == Some("fr") {
        text = text.replace('.', ",");
    }

    // Only the rendered text changes; type and raw value pass through.
    Ok(TypedValue {
        text,
        ty: value.ty,
        value: value.value,
    })
}

/// Exact decimal scaling of `value` by `10^decimals`, no rounding and no
/// trimming: the fraction always carries `decimals` digits.
fn format_units(value: &BigInt, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let divisor = BigInt::from(10u8).pow(decimals);
    let negative = value.sign() == Sign::Minus;
    let magnitude = if negative { -value } else { value.clone() };
    let whole = &magnitude / &divisor;
    let mut fraction = (&magnitude % &divisor).to_string();
    while fraction.len() < decimals as usize {
        fraction.insert(0, '0');
    }
    format!("{}{}.{}", if negative { "-" } else { "" }, whole, fraction)
}

fn quote(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    FormatError::check_arity(name, 1, params.len())?;
    let value = evaluate(&params[0], args, metadata)?;
    // Standard JSON string escaping is the contract here.
    let quoted = serde_json::to_string(&value.text)
        .map_err(|e| FormatError::Serialization(e.to_string()))?;
    Ok(TypedValue {
        text: quoted,
        ty: value.ty,
        value: value.value,
    })
}

// ============================================================================
// Hashing
// ============================================================================

fn hash_operand_string(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    FormatError::check_arity(name, 1, params.len())?;
    let value = evaluate(&params[0], args, metadata)?;
    if value.ty != ParamType::String {
        return Err(FormatError::TypeMismatch {
            function: name.to_string(),
            expected: "string".to_string(),
            actual: value.ty.canonical_name(),
        });
    }
    Ok(value)
}

fn hash_operand_bytes(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<Vec<u8>> {
    FormatError::check_arity(name, 1, params.len())?;
    let value = evaluate(&params[0], args, metadata)?;
    if value.ty != ParamType::Bytes {
        return Err(FormatError::TypeMismatch {
            function: name.to_string(),
            expected: "bytes".to_string(),
            actual: value.ty.canonical_name(),
        });
    }
    Ok(value.as_bytes(name)?.to_vec())
}

fn id_fn(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    let operand = hash_operand_string(name, params, args, metadata)?;
    let digest = crypto::id(operand.as_str(name)?);
    Ok(TypedValue::bytes(ParamType::FixedBytes(32), digest.to_vec()))
}

fn keccak256_fn(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    let data = hash_operand_bytes(name, params, args, metadata)?;
    let digest = crypto::keccak256(&data);
    Ok(TypedValue::bytes(ParamType::FixedBytes(32), digest.to_vec()))
}

fn sha256_fn(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    let data = hash_operand_bytes(name, params, args, metadata)?;
    let digest = crypto::sha256(&data);
    Ok(TypedValue::bytes(ParamType::FixedBytes(32), digest.to_vec()))
}

fn namehash_fn(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    let operand = hash_operand_string(name, params, args, metadata)?;
    let node = crypto::namehash(operand.as_str(name)?);
    // The rendered text stays the original name; only the raw value is
    // the hash.
    Ok(TypedValue {
        text: operand.text,
        ty: ParamType::FixedBytes(32),
        value: RawValue::Bytes(node.to_vec()),
    })
}

fn sighash_fn(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    let operand = hash_operand_string(name, params, args, metadata)?;
    let selector = crypto::sighash(operand.as_str(name)?)?;
    Ok(TypedValue {
        text: operand.text,
        ty: ParamType::FixedBytes(4),
        value: RawValue::Bytes(selector.to_vec()),
    })
}

fn topichash_fn(
    name: &str,
    params: &[Node],
    args: &[TypedValue],
    metadata: &Metadata,
) -> FormatResult<TypedValue> {
    let operand = hash_operand_string(name, params, args, metadata)?;
    let topic = crypto::topichash(operand.as_str(name)?)?;
    Ok(TypedValue {
        text: operand.text,
        ty: ParamType::FixedBytes(32),
        value: RawValue::Bytes(topic.to_vec()),
    })
}
