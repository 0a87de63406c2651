//! Commitment building.
//!
//! `build` orchestrates the whole pipeline: normalize the declared
//! argument types and raw values once, render every template source,
//! aggregate the per-template digests and the argument-type signature into
//! a single `formatId`, and pack the arguments into the byte payload a
//! user signs. The call is atomic; any failure aborts with no partial
//! result.

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::ast::Fragment;
use crate::crypto::{checksum_address, id, keccak256};
use crate::error::{FormatError, FormatResult};
use crate::eval::evaluate;
use crate::normalize::normalize_args;
use crate::pack::{length_prefix, pack_fixed};
use crate::parser;
use crate::types::ParamType;
use crate::value::{Metadata, RawValue, TypedValue};

/// One rendered template with its metadata directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedString {
    pub text: String,
    pub metadata: Metadata,
}

/// The full build result. Immutable once returned.
///
/// `format_id` binds the set of accepted template variants and the
/// argument-type signature; `bytes` is the payload a user signs
/// (`address ++ format_id ++ packed arguments`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commitment {
    #[serde(serialize_with = "hex_digest")]
    pub format_id: [u8; 32],
    #[serde(serialize_with = "hex_digests")]
    pub format_string_ids: Vec<[u8; 32]>,
    pub strings: Vec<RenderedString>,
    /// Normalized declarations, `skip:` tags included.
    pub arg_types: Vec<String>,
    /// The actually-emitted type sequence, header included.
    pub format_arg_types: Vec<String>,
    #[serde(with = "hex::serde")]
    pub bytes: Vec<u8>,
}

/// Build a commitment for `address` over the given template sources,
/// declared argument types (optionally `skip:`-tagged), and raw values.
pub fn build(
    address: &str,
    format_strings: &[impl AsRef<str>],
    arg_types: &[impl AsRef<str>],
    args: &[impl AsRef<str>],
) -> FormatResult<Commitment> {
    let (_, address_bytes) = checksum_address(address)?;
    let (declarations, values) = normalize_args(arg_types, args)?;
    debug!(args = values.len(), templates = format_strings.len(), "normalized arguments");

    let mut strings = Vec::with_capacity(format_strings.len());
    for source in format_strings {
        strings.push(render_template(source.as_ref(), &values)?);
    }

    // Digests of the raw template sources, sorted so the commitment is
    // independent of template ordering.
    let mut format_string_ids: Vec<[u8; 32]> =
        format_strings.iter().map(|s| id(s.as_ref())).collect();
    format_string_ids.sort_unstable();

    let arg_types: Vec<String> = declarations.iter().map(|d| d.declaration()).collect();
    let format_id = compute_format_id(&format_string_ids, &arg_types);
    debug!(format_id = %hex::encode(format_id), "format id computed");

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&address_bytes);
    bytes.extend_from_slice(&format_id);

    let mut format_arg_types = vec!["address".to_string(), "bytes32".to_string()];
    for (decl, value) in declarations.iter().zip(&values) {
        if decl.skip {
            continue;
        }
        match (&decl.ty, &value.value) {
            (ParamType::String, RawValue::Str(text)) => {
                let data = text.as_bytes();
                format_arg_types.push("uint256".to_string());
                bytes.extend_from_slice(&length_prefix(data.len()));
                bytes.extend_from_slice(data);
                format_arg_types.push(decl.ty.canonical_name());
            }
            (ParamType::Bytes, RawValue::Bytes(data)) => {
                format_arg_types.push("uint256".to_string());
                bytes.extend_from_slice(&length_prefix(data.len()));
                bytes.extend_from_slice(data);
                format_arg_types.push(decl.ty.canonical_name());
            }
            _ => {
                bytes.extend_from_slice(&pack_fixed(&decl.ty, &value.value)?);
                format_arg_types.push(decl.ty.canonical_name());
            }
        }
    }

    Ok(Commitment {
        format_id,
        format_string_ids,
        strings,
        arg_types,
        format_arg_types,
        bytes,
    })
}

/// `formatId = keccak256( keccak256(concat(sorted ids)) ++
/// keccak256(UTF8(join(argTypes, ","))) )`
fn compute_format_id(sorted_ids: &[[u8; 32]], arg_types: &[String]) -> [u8; 32] {
    let mut concat = Vec::with_capacity(32 * sorted_ids.len());
    for digest in sorted_ids {
        concat.extend_from_slice(digest);
    }
    let mut bound = [0u8; 64];
    bound[..32].copy_from_slice(&keccak256(&concat));
    bound[32..].copy_from_slice(&id(&arg_types.join(",")));
    keccak256(&bound)
}

fn render_template(source: &str, values: &[TypedValue]) -> FormatResult<RenderedString> {
    let fragments = parser::parse(source)?;

    // Metadata from every text fragment is visible to every substitution,
    // including directives that appear later in the template.
    let mut metadata = Metadata::new();
    for fragment in &fragments {
        if let Fragment::Text { directives, .. } = fragment {
            for directive in directives {
                let (key, value) = directive
                    .split_once('=')
                    .ok_or_else(|| FormatError::MalformedMetadata(directive.clone()))?;
                let key = key.to_lowercase();
                if metadata.contains_key(&key) {
                    return Err(FormatError::DuplicateMetadataKey(key));
                }
                metadata.insert(key, value.to_string());
            }
        }
    }

    let mut text = String::new();
    for fragment in &fragments {
        match fragment {
            Fragment::Text { text: literal, .. } => text.push_str(literal),
            Fragment::Substitution(node) => {
                text.push_str(&evaluate(node, values, &metadata)?.text);
            }
        }
    }

    Ok(RenderedString { text, metadata })
}

fn hex_digest<S: Serializer>(digest: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(digest)))
}

fn hex_digests<S: Serializer>(digests: &[[u8; 32]], serializer: S) -> Result<S::Ok, S::Error> {
    let encoded: Vec<String> = digests
        .iter()
        .map(|d| format!("0x{}", hex::encode(d)))
        .collect();
    encoded.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ADDRESS: &str = "0x1234567890123456789012345678901234567890";

    #[test]
    fn test_metadata_applies_before_and_after_substitutions() {
        // The locale directive appears after the substitution but still
        // affects it.
        let commitment = build(
            ADDRESS,
            &["${ formatUnits(atIndex(1), 2) }\\m{locale=fr} fin"],
            &["uint"],
            &["150"],
        )
        .unwrap();
        assert_eq!(commitment.strings[0].text, "1,50 fin");
        assert_eq!(
            commitment.strings[0].metadata.get("locale"),
            Some(&"fr".to_string())
        );
    }

    #[test]
    fn test_duplicate_metadata_key_rejected() {
        let err = build(
            ADDRESS,
            &["\\m{locale=en}\\m{LOCALE=fr}hi"],
            &[] as &[&str],
            &[] as &[&str],
        )
        .unwrap_err();
        assert_eq!(err, FormatError::DuplicateMetadataKey("locale".to_string()));
    }

    #[test]
    fn test_malformed_metadata_rejected() {
        let err = build(ADDRESS, &["\\m{localefr}hi"], &[] as &[&str], &[] as &[&str]).unwrap_err();
        assert_eq!(
            err,
            FormatError::MalformedMetadata("localefr".to_string())
        );
    }

    #[test]
    fn test_payload_header_is_address_then_format_id() {
        let commitment = build(ADDRESS, &["static"], &[] as &[&str], &[] as &[&str]).unwrap();
        assert_eq!(commitment.bytes.len(), 20 + 32);
        assert_eq!(
            &commitment.bytes[..20],
            hex::decode("1234567890123456789012345678901234567890")
                .unwrap()
                .as_slice()
        );
        assert_eq!(&commitment.bytes[20..], &commitment.format_id);
        assert_eq!(commitment.format_arg_types, vec!["address", "bytes32"]);
    }

    #[test]
    fn test_format_id_invariant_under_template_permutation() {
        let en = "\\m{locale=en}Hello ${ atIndex(1) }";
        let fr = "\\m{locale=fr}Bonjour ${ atIndex(1) }";
        let forward = build(ADDRESS, &[en, fr], &["string"], &["world"]).unwrap();
        let reversed = build(ADDRESS, &[fr, en], &["string"], &["world"]).unwrap();
        assert_eq!(forward.format_id, reversed.format_id);
        assert_eq!(forward.format_string_ids, reversed.format_string_ids);
    }

    #[test]
    fn test_format_id_binds_arg_types() {
        let a = build(ADDRESS, &["t"], &["uint"], &["1"]).unwrap();
        let b = build(ADDRESS, &["t"], &["uint64"], &["1"]).unwrap();
        assert_ne!(a.format_id, b.format_id);

        // The skip tag is part of the signature too.
        let c = build(ADDRESS, &["t"], &["skip:uint"], &["1"]).unwrap();
        assert_ne!(a.format_id, c.format_id);
    }

    #[test]
    fn test_dynamic_argument_gets_length_prefix() {
        let commitment = build(ADDRESS, &["t"], &["string"], &["abc"]).unwrap();
        let body = &commitment.bytes[52..];
        assert_eq!(body.len(), 32 + 3);
        assert_eq!(body[31], 3);
        assert_eq!(&body[32..], b"abc");
        assert_eq!(
            commitment.format_arg_types,
            vec!["address", "bytes32", "uint256", "string"]
        );
    }

    #[test]
    fn test_skip_argument_excluded_from_payload() {
        let commitment = build(
            ADDRESS,
            &["${ quote(atIndex(1)) }"],
            &["skip:string"],
            &["secret"],
        )
        .unwrap();
        // Readable by the template...
        assert_eq!(commitment.strings[0].text, "\"secret\"");
        // ...but absent from the payload and the emitted type sequence.
        assert_eq!(commitment.bytes.len(), 52);
        assert_eq!(commitment.format_arg_types, vec!["address", "bytes32"]);
        assert_eq!(commitment.arg_types, vec!["skip:string"]);
    }

    #[test]
    fn test_failure_is_atomic() {
        // equals fails in the second template; nothing is produced.
        let result = build(
            ADDRESS,
            &["ok ${ atIndex(1) }", "${ equals(atIndex(1), \"other\"), atIndex(1) }"],
            &["string"],
            &["value"],
        );
        assert!(matches!(result, Err(FormatError::ValueMismatch { .. })));
    }

    #[test]
    fn test_invalid_target_address_rejected() {
        assert!(matches!(
            build("0x12345", &["t"], &[] as &[&str], &[] as &[&str]),
            Err(FormatError::InvalidAddress(_))
        ));
    }
}
