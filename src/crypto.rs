//! Hashing, address, and signature primitives.
//!
//! This module is the crypto/ABI collaborator boundary: keccak256 and
//! sha256 digests, the keccak-of-UTF-8 `id` helper, ENS namehash, EIP-55
//! checksummed addresses, and canonical function/event signature
//! formatting. Everything here is deterministic and allocation-light;
//! digests come back as fixed `[u8; 32]` arrays.

use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::error::FormatError;
use crate::types::ParamType;

/// keccak256 of arbitrary bytes
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// sha256 of arbitrary bytes
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// keccak256 of a string's UTF-8 bytes
pub fn id(text: &str) -> [u8; 32] {
    keccak256(text.as_bytes())
}

/// ENS namehash: fold keccak256 over the dot-separated labels, rightmost
/// first, starting from the zero node. The empty name is the zero node.
///
/// Labels are hashed as given; UTS-46 normalization is out of scope here.
pub fn namehash(name: &str) -> [u8; 32] {
    let mut node = [0u8; 32];
    if name.is_empty() {
        return node;
    }
    for label in name.split('.').rev() {
        let label_hash = keccak256(label.as_bytes());
        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(&node);
        combined[32..].copy_from_slice(&label_hash);
        node = keccak256(&combined);
    }
    node
}

/// Validate an account address and return its EIP-55 checksummed form plus
/// the raw 20 bytes.
///
/// All-lowercase and all-uppercase hex are accepted; mixed case must match
/// the checksum exactly.
pub fn checksum_address(input: &str) -> Result<(String, [u8; 20]), FormatError> {
    let invalid = || FormatError::InvalidAddress(input.to_string());

    let hex_part = input.strip_prefix("0x").ok_or_else(invalid)?;
    if hex_part.len() != 40 || !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let mut raw = [0u8; 20];
    hex::decode_to_slice(hex_part, &mut raw).map_err(|_| invalid())?;

    let lower = hex_part.to_ascii_lowercase();
    let hash = keccak256(lower.as_bytes());
    let checksummed: String = lower
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let nibble = (hash[i / 2] >> if i % 2 == 0 { 4 } else { 0 }) & 0x0f;
            if b.is_ascii_alphabetic() && nibble >= 8 {
                b.to_ascii_uppercase() as char
            } else {
                b as char
            }
        })
        .collect();

    let all_lower = hex_part == lower;
    let all_upper = hex_part == lower.to_ascii_uppercase();
    if !all_lower && !all_upper && hex_part != checksummed {
        return Err(invalid());
    }

    Ok((format!("0x{}", checksummed), raw))
}

/// Canonicalize a function or event signature to its `name(type,…)` form:
/// parameter names, `indexed` markers, and data-location keywords are
/// dropped, type aliases are expanded, array suffixes are preserved.
///
/// Tuple parameters are not supported.
pub fn canonical_signature(signature: &str) -> Result<String, FormatError> {
    let invalid = || FormatError::InvalidSignature(signature.to_string());

    let trimmed = signature.trim();
    let open = trimmed.find('(').ok_or_else(invalid)?;
    let name = trimmed[..open].trim();
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        return Err(invalid());
    }

    let rest = &trimmed[open + 1..];
    let close = rest.rfind(')').ok_or_else(invalid)?;
    if !rest[close + 1..].trim().is_empty() {
        return Err(invalid());
    }
    let params_src = &rest[..close];
    if params_src.contains('(') {
        // Nested parentheses would mean a tuple parameter.
        return Err(invalid());
    }

    let mut params = Vec::new();
    if !params_src.trim().is_empty() {
        for param in params_src.split(',') {
            params.push(canonical_param(param).ok_or_else(invalid)?);
        }
    }

    Ok(format!("{}({})", name, params.join(",")))
}

/// First 4 bytes of the keccak256 of a canonical function signature.
pub fn sighash(signature: &str) -> Result<[u8; 4], FormatError> {
    let canonical = canonical_signature(signature)?;
    let digest = id(&canonical);
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    Ok(selector)
}

/// Full keccak256 of a canonical event signature.
pub fn topichash(signature: &str) -> Result<[u8; 32], FormatError> {
    let canonical = canonical_signature(signature)?;
    Ok(id(&canonical))
}

fn canonical_param(param: &str) -> Option<String> {
    let tokens: Vec<&str> = param
        .split_whitespace()
        .filter(|t| !matches!(*t, "indexed" | "memory" | "calldata" | "storage"))
        .collect();
    // The type, optionally followed by a parameter name.
    let ty = match tokens.as_slice() {
        [ty] | [ty, _] => *ty,
        _ => return None,
    };

    let (base, suffix) = match ty.find('[') {
        Some(idx) => (&ty[..idx], &ty[idx..]),
        None => (ty, ""),
    };
    if !suffix.is_empty() && !suffix.chars().all(|c| matches!(c, '[' | ']' | '0'..='9')) {
        return None;
    }
    let canonical_base = base.parse::<ParamType>().ok()?.canonical_name();
    Some(format!("{}{}", canonical_base, suffix))
}

/// Hash bytes as a `0x…` hex string for display
pub fn hash_to_hex(hash: &[u8]) -> String {
    format!("0x{}", hex::encode(hash))
}
