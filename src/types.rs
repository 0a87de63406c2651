//! Canonical ABI parameter types and `skip:`-tagged argument declarations.
//!
//! Declared type strings are normalized through [`ParamType`] before they are
//! compared, hashed into the format commitment, or used to drive payload
//! packing. Aliases are expanded during parsing (`uint` -> `uint256`,
//! `int` -> `int256`, `boolean` -> `bool`) so the canonical name is the only
//! spelling the rest of the crate ever sees.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// A canonical scalar/byte/dynamic parameter type.
///
/// Integer widths are in bits (8..=256, multiples of 8); fixed byte widths
/// are in bytes (1..=32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    Int(u16),
    Uint(u16),
    Bool,
    Address,
    Bytes,
    FixedBytes(u8),
    String,
}

impl ParamType {
    /// The canonical type name, e.g. `uint256` or `bytes32`.
    pub fn canonical_name(&self) -> String {
        match self {
            ParamType::Int(width) => format!("int{}", width),
            ParamType::Uint(width) => format!("uint{}", width),
            ParamType::Bool => "bool".to_string(),
            ParamType::Address => "address".to_string(),
            ParamType::Bytes => "bytes".to_string(),
            ParamType::FixedBytes(len) => format!("bytes{}", len),
            ParamType::String => "string".to_string(),
        }
    }

    /// True for `intN`/`uintN` of any width.
    pub fn is_integer(&self) -> bool {
        matches!(self, ParamType::Int(_) | ParamType::Uint(_))
    }

    /// Packed width in bytes; `None` for dynamic types (`string`, `bytes`).
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ParamType::Int(width) | ParamType::Uint(width) => Some(*width as usize / 8),
            ParamType::Bool => Some(1),
            ParamType::Address => Some(20),
            ParamType::FixedBytes(len) => Some(*len as usize),
            ParamType::Bytes | ParamType::String => None,
        }
    }

    /// True for dynamic-length types that take a length prefix in the payload.
    pub fn is_dynamic(&self) -> bool {
        self.fixed_width().is_none()
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

fn parse_width(digits: &str, input: &str) -> Result<u16, FormatError> {
    let width: u16 = digits
        .parse()
        .map_err(|_| unknown_type(input))?;
    if width == 0 || width > 256 || width % 8 != 0 {
        return Err(unknown_type(input));
    }
    Ok(width)
}

fn unknown_type(input: &str) -> FormatError {
    FormatError::UnsupportedType {
        ty: input.to_string(),
        position: 0,
    }
}

impl FromStr for ParamType {
    type Err = FormatError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        match s {
            "int" => return Ok(ParamType::Int(256)),
            "uint" => return Ok(ParamType::Uint(256)),
            "bool" | "boolean" => return Ok(ParamType::Bool),
            "address" => return Ok(ParamType::Address),
            "bytes" => return Ok(ParamType::Bytes),
            "string" => return Ok(ParamType::String),
            _ => {}
        }
        if let Some(digits) = s.strip_prefix("uint") {
            return Ok(ParamType::Uint(parse_width(digits, input)?));
        }
        if let Some(digits) = s.strip_prefix("int") {
            return Ok(ParamType::Int(parse_width(digits, input)?));
        }
        if let Some(digits) = s.strip_prefix("bytes") {
            let len: u8 = digits.parse().map_err(|_| unknown_type(input))?;
            if len == 0 || len > 32 {
                return Err(unknown_type(input));
            }
            return Ok(ParamType::FixedBytes(len));
        }
        Err(unknown_type(input))
    }
}

/// An argument-type declaration, optionally tagged `skip:`.
///
/// Skip-tagged arguments are bound into templates (reachable via `atIndex`)
/// but contribute nothing to the packed payload. The tag survives
/// normalization because the declaration string, tag included, is part of
/// the argument-type signature hashed into the format id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgType {
    pub skip: bool,
    pub ty: ParamType,
}

impl ArgType {
    /// Parse a declaration at the given argument position (used for error
    /// reporting only).
    pub fn parse(decl: &str, position: usize) -> Result<Self, FormatError> {
        let (skip, rest) = match decl.strip_prefix("skip:") {
            Some(rest) => (true, rest),
            None => (false, decl),
        };
        let ty = rest.parse::<ParamType>().map_err(|_| FormatError::UnsupportedType {
            ty: decl.to_string(),
            position,
        })?;
        Ok(ArgType { skip, ty })
    }

    /// Re-emit the normalized declaration, `skip:` tag included.
    pub fn declaration(&self) -> String {
        if self.skip {
            format!("skip:{}", self.ty.canonical_name())
        } else {
            self.ty.canonical_name()
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.declaration())
    }
}
