//! Solidity-style packed encoding for the signed payload.
//!
//! Fixed-width values are emitted at exactly their declared width with no
//! padding between arguments: integers big-endian two's complement, `bool`
//! one byte, `bytesN` verbatim. Dynamic values (`string`, unbounded
//! `bytes`) are handled by the builder with a big-endian `uint256` length
//! prefix produced here.

use num_bigint::{BigInt, Sign};
use num_traits::One;

use crate::error::FormatError;
use crate::types::ParamType;
use crate::value::RawValue;

/// Big-endian `uint256` length prefix for a dynamic value.
pub fn length_prefix(len: usize) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[32 - 8..].copy_from_slice(&(len as u64).to_be_bytes());
    out
}

/// Pack an integer at `width` bits, big-endian two's complement.
///
/// Out-of-range values are rejected rather than truncated; `context` names
/// the canonical type for the error message.
pub fn pack_int(
    value: &BigInt,
    width: u16,
    signed: bool,
    context: &str,
) -> Result<Vec<u8>, FormatError> {
    let bits = width as u32;
    let out_of_range = || FormatError::InvalidNumber {
        value: value.to_string(),
        context: context.to_string(),
    };

    let bound: BigInt = BigInt::one() << if signed { bits - 1 } else { bits };
    if signed {
        if value >= &bound || value < &(-&bound) {
            return Err(out_of_range());
        }
    } else if value.sign() == Sign::Minus || value >= &bound {
        return Err(out_of_range());
    }

    // Two's complement: negative values wrap modulo 2^bits.
    let unsigned = if value.sign() == Sign::Minus {
        value + (BigInt::one() << bits)
    } else {
        value.clone()
    };

    let width_bytes = width as usize / 8;
    let magnitude = unsigned.to_bytes_be().1;
    let mut out = vec![0u8; width_bytes - magnitude.len()];
    out.extend_from_slice(&magnitude);
    Ok(out)
}

/// Pack one fixed-width value at its declared type's width.
pub fn pack_fixed(ty: &ParamType, value: &RawValue) -> Result<Vec<u8>, FormatError> {
    match (ty, value) {
        (ParamType::Uint(width), RawValue::Int(v)) => {
            pack_int(v, *width, false, &ty.canonical_name())
        }
        (ParamType::Int(width), RawValue::Int(v)) => {
            pack_int(v, *width, true, &ty.canonical_name())
        }
        (ParamType::Bool, RawValue::Bool(v)) => Ok(vec![u8::from(*v)]),
        (ParamType::FixedBytes(len), RawValue::Bytes(data)) => {
            if data.len() != *len as usize {
                return Err(FormatError::LengthMismatch {
                    context: ty.canonical_name(),
                    expected: *len as usize,
                    actual: data.len(),
                });
            }
            Ok(data.clone())
        }
        (ParamType::Address, RawValue::Bytes(data)) => Ok(data.clone()),
        _ => Err(FormatError::UnsupportedConversion {
            function: "pack".to_string(),
            from: format!("{} as {}", value.family(), ty.canonical_name()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn test_length_prefix_is_uint256() {
        let prefix = length_prefix(10);
        assert_eq!(prefix.len(), 32);
        assert_eq!(prefix[31], 10);
        assert!(prefix[..31].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pack_uint_width() {
        let packed = pack_int(&BigInt::from(0x1234), 64, false, "uint64").unwrap();
        assert_eq!(packed, vec![0, 0, 0, 0, 0, 0, 0x12, 0x34]);
    }

    #[test]
    fn test_pack_uint256_width() {
        let packed = pack_int(&BigInt::from(1), 256, false, "uint256").unwrap();
        assert_eq!(packed.len(), 32);
        assert_eq!(packed[31], 1);
    }

    #[test]
    fn test_pack_negative_twos_complement() {
        let packed = pack_int(&BigInt::from(-1), 16, true, "int16").unwrap();
        assert_eq!(packed, vec![0xff, 0xff]);
        let packed = pack_int(&BigInt::from(-2), 8, true, "int8").unwrap();
        assert_eq!(packed, vec![0xfe]);
    }

    #[test]
    fn test_pack_range_checks() {
        assert!(pack_int(&BigInt::from(256), 8, false, "uint8").is_err());
        assert!(pack_int(&BigInt::from(-1), 8, false, "uint8").is_err());
        assert!(pack_int(&BigInt::from(128), 8, true, "int8").is_err());
        assert!(pack_int(&BigInt::from(-129), 8, true, "int8").is_err());
        assert!(pack_int(&BigInt::from(127), 8, true, "int8").is_ok());
        assert!(pack_int(&BigInt::from(-128), 8, true, "int8").is_ok());
    }

    #[test]
    fn test_pack_fixed_bytes_exact_length() {
        let ty = ParamType::FixedBytes(4);
        let ok = pack_fixed(&ty, &RawValue::Bytes(vec![1, 2, 3, 4])).unwrap();
        assert_eq!(ok, vec![1, 2, 3, 4]);
        assert!(pack_fixed(&ty, &RawValue::Bytes(vec![1, 2])).is_err());
    }

    #[test]
    fn test_pack_bool() {
        assert_eq!(
            pack_fixed(&ParamType::Bool, &RawValue::Bool(true)).unwrap(),
            vec![1]
        );
        assert_eq!(
            pack_fixed(&ParamType::Bool, &RawValue::Bool(false)).unwrap(),
            vec![0]
        );
    }
}
