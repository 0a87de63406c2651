//! End-to-end commitment tests over the two-locale DAI transfer scenario.

use format_commit::{build, crypto, FormatError};
use pretty_assertions::assert_eq;

const ADDRESS: &str = "0x1234567890123456789012345678901234567890";

const TEMPLATE_EN: &str = "\\m{locale=en}Hello! Would you like to send ${ equals(atIndex(1), namehash(atIndex(3))), quote(atIndex(3)) } $$${ formatUnits(uint64(atIndex(2)), 18) } (DAI)?";
const TEMPLATE_FR: &str = "\\m{locale=fr}Bonjour! Souhaitez-vous transf\\u{e9}rer ${ formatUnits(uint64(atIndex(2)), 18) }$$ (DAI) \\u{e0} ${ equals(atIndex(1), namehash(atIndex(3))), quote(atIndex(3)) }?";

fn scenario_args() -> (Vec<&'static str>, Vec<String>) {
    let name_hash = format!("0x{}", hex::encode(crypto::namehash("ricmoo.eth")));
    (
        vec!["bytes32", "uint", "skip:string"],
        vec![name_hash, "0x12345678900000".to_string(), "ricmoo.eth".to_string()],
    )
}

#[test]
fn end_to_end_two_locale_transfer() {
    let (arg_types, args) = scenario_args();
    let commitment = build(ADDRESS, &[TEMPLATE_EN, TEMPLATE_FR], &arg_types, &args).unwrap();

    // Rendered strings differ only in wording and locale punctuation.
    assert_eq!(
        commitment.strings[0].text,
        "Hello! Would you like to send \"ricmoo.eth\" $0.005124095575326720 (DAI)?"
    );
    assert_eq!(
        commitment.strings[1].text,
        "Bonjour! Souhaitez-vous transférer 0,005124095575326720$ (DAI) à \"ricmoo.eth\"?"
    );
    assert_eq!(
        commitment.strings[0].metadata.get("locale"),
        Some(&"en".to_string())
    );
    assert_eq!(
        commitment.strings[1].metadata.get("locale"),
        Some(&"fr".to_string())
    );

    // Normalized declarations keep the skip tag; the emitted sequence
    // drops the skipped argument.
    assert_eq!(
        commitment.arg_types,
        vec!["bytes32", "uint256", "skip:string"]
    );
    assert_eq!(
        commitment.format_arg_types,
        vec!["address", "bytes32", "bytes32", "uint256"]
    );

    // Payload: address ++ formatId ++ bytes32 arg ++ packed uint256.
    assert_eq!(commitment.bytes.len(), 20 + 32 + 32 + 32);
    assert_eq!(
        &commitment.bytes[..20],
        hex::decode("1234567890123456789012345678901234567890")
            .unwrap()
            .as_slice()
    );
    assert_eq!(&commitment.bytes[20..52], &commitment.format_id);
    assert_eq!(&commitment.bytes[52..84], &crypto::namehash("ricmoo.eth"));
    let mut expected_amount = [0u8; 32];
    expected_amount[25..].copy_from_slice(&[0x12, 0x34, 0x56, 0x78, 0x90, 0x00, 0x00]);
    assert_eq!(&commitment.bytes[84..], &expected_amount);
}

#[test]
fn format_id_is_deterministic_and_order_independent() {
    let (arg_types, args) = scenario_args();
    let forward = build(ADDRESS, &[TEMPLATE_EN, TEMPLATE_FR], &arg_types, &args).unwrap();
    let again = build(ADDRESS, &[TEMPLATE_EN, TEMPLATE_FR], &arg_types, &args).unwrap();
    let reversed = build(ADDRESS, &[TEMPLATE_FR, TEMPLATE_EN], &arg_types, &args).unwrap();

    assert_eq!(forward.format_id, again.format_id);
    assert_eq!(forward.format_id, reversed.format_id);
    assert_eq!(forward.format_string_ids, reversed.format_string_ids);

    // Sorted ascending by byte value.
    let mut sorted = forward.format_string_ids.clone();
    sorted.sort();
    assert_eq!(forward.format_string_ids, sorted);
}

#[test]
fn equals_assertion_aborts_the_whole_build() {
    let (arg_types, _) = scenario_args();
    // Wrong name: atIndex(1) no longer matches namehash(atIndex(3)).
    let name_hash = format!("0x{}", hex::encode(crypto::namehash("ricmoo.eth")));
    let args = vec![name_hash, "0x12345678900000".to_string(), "other.eth".to_string()];
    let result = build(ADDRESS, &[TEMPLATE_EN, TEMPLATE_FR], &arg_types, &args);
    assert!(matches!(result, Err(FormatError::ValueMismatch { .. })));
}

#[test]
fn skip_argument_readable_but_unpacked() {
    let (arg_types, args) = scenario_args();
    let commitment = build(ADDRESS, &[TEMPLATE_EN], &arg_types, &args).unwrap();

    // The skipped string renders into the text...
    assert!(commitment.strings[0].text.contains("\"ricmoo.eth\""));
    // ...but "ricmoo.eth" contributes no payload bytes.
    assert_eq!(commitment.bytes.len(), 116);
    assert!(!commitment
        .format_arg_types
        .iter()
        .any(|t| t == "string"));
}
