//! Nom-based template parser.
//!
//! Turns a raw template string into an ordered list of [`Fragment`]s:
//!
//! - plain text, with escapes `\\`, `\$`, `\{`, `\}`, `\u{XXXX}` and
//!   `$$` for a literal dollar sign;
//! - `\m{key=value}` metadata directives, collected on the enclosing
//!   text fragment (they render no text);
//! - `${ expr, expr, ... }` substitutions holding a small expression
//!   grammar: function calls `name(...)`, `true`/`false`, `0x...` bytes,
//!   decimal integers, and `"..."` strings.
//!
//! Directive content is kept raw here; `key=value` shape and key
//! uniqueness are enforced by the commitment builder.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, hex_digit0, hex_digit1, multispace0},
    combinator::{all_consuming, cut, map, opt, recognize},
    error::{context, convert_error, ErrorKind, ParseError as NomParseError, VerboseError},
    multi::{many0, many1, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded},
    IResult,
};
use num_bigint::BigInt;

use crate::ast::{Fragment, Literal, Node};
use crate::error::FormatError;

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete template into fragments.
pub fn parse(template: &str) -> Result<Vec<Fragment>, FormatError> {
    match all_consuming(fragments)(template) {
        Ok((_, frags)) => Ok(frags),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(FormatError::Parse(convert_error(template, e)))
        }
        Err(nom::Err::Incomplete(_)) => Err(FormatError::Parse("incomplete input".to_string())),
    }
}

// ============================================================================
// Fragments
// ============================================================================

fn fragments(input: &str) -> PResult<Vec<Fragment>> {
    many0(alt((substitution_fragment, text_fragment)))(input)
}

/// One parsed piece of a text run.
enum Piece {
    Chunk(String),
    Directive(String),
}

fn text_fragment(input: &str) -> PResult<Fragment> {
    let (input, pieces) = many1(text_piece)(input)?;
    let mut text = String::new();
    let mut directives = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Chunk(chunk) => text.push_str(&chunk),
            Piece::Directive(directive) => directives.push(directive),
        }
    }
    Ok((input, Fragment::Text { text, directives }))
}

fn text_piece(input: &str) -> PResult<Piece> {
    alt((
        preceded(char('\\'), escape_sequence),
        map(tag("$$"), |_| Piece::Chunk("$".to_string())),
        map(plain_chunk, |s: &str| Piece::Chunk(s.to_string())),
        map(lone_dollar, |_| Piece::Chunk("$".to_string())),
    ))(input)
}

fn plain_chunk(input: &str) -> PResult<&str> {
    take_while1(|c| c != '$' && c != '\\')(input)
}

/// A `$` that opens neither a substitution nor a `$$` escape is literal.
fn lone_dollar(input: &str) -> PResult<char> {
    let rest = input.strip_prefix('$').ok_or_else(|| err_at(input))?;
    if rest.starts_with('{') || rest.starts_with('$') {
        return Err(err_at(input));
    }
    Ok((rest, '$'))
}

fn escape_sequence(input: &str) -> PResult<Piece> {
    alt((
        map(char('\\'), |_| Piece::Chunk("\\".to_string())),
        map(char('$'), |_| Piece::Chunk("$".to_string())),
        map(char('{'), |_| Piece::Chunk("{".to_string())),
        map(char('}'), |_| Piece::Chunk("}".to_string())),
        map(preceded(char('u'), unicode_braces), |c| {
            Piece::Chunk(c.to_string())
        }),
        map(preceded(char('m'), directive_braces), Piece::Directive),
    ))(input)
}

fn unicode_braces(input: &str) -> PResult<char> {
    let (rest, digits) = delimited(char('{'), hex_digit1, char('}'))(input)?;
    u32::from_str_radix(digits, 16)
        .ok()
        .and_then(char::from_u32)
        .map(|c| (rest, c))
        .ok_or_else(|| err_at(input))
}

fn directive_braces(input: &str) -> PResult<String> {
    map(
        delimited(char('{'), take_while(|c| c != '}'), char('}')),
        |s: &str| s.to_string(),
    )(input)
}

// ============================================================================
// Substitutions and expressions
// ============================================================================

fn substitution_fragment(input: &str) -> PResult<Fragment> {
    let (input, _) = tag("${")(input)?;
    let (input, exprs) = separated_list1(char(','), delimited(multispace0, expr, multispace0))(input)?;
    let (input, _) = cut(context("closing brace", char('}')))(input)?;
    Ok((input, Fragment::Substitution(Node::Substitution(exprs))))
}

fn expr(input: &str) -> PResult<Node> {
    alt((
        call,
        boolean_literal,
        bytes_literal,
        number_literal,
        string_literal,
    ))(input)
}

fn call(input: &str) -> PResult<Node> {
    let (input, name) = identifier(input)?;
    let (input, _) = char('(')(input)?;
    let (input, params) =
        separated_list0(char(','), delimited(multispace0, expr, multispace0))(input)?;
    let (input, _) = cut(context("closing parenthesis", char(')')))(input)?;
    Ok((input, Node::call(name, params)))
}

fn identifier(input: &str) -> PResult<&str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn boolean_literal(input: &str) -> PResult<Node> {
    let (rest, word) = identifier(input)?;
    match word {
        "true" => Ok((rest, Node::Literal(Literal::Bool(true)))),
        "false" => Ok((rest, Node::Literal(Literal::Bool(false)))),
        _ => Err(err_at(input)),
    }
}

fn bytes_literal(input: &str) -> PResult<Node> {
    let (rest, digits) = preceded(tag("0x"), hex_digit0)(input)?;
    if digits.len() % 2 != 0 {
        return Err(err_at(input));
    }
    let data = hex::decode(digits).map_err(|_| err_at(input))?;
    Ok((rest, Node::Literal(Literal::Bytes(data))))
}

fn number_literal(input: &str) -> PResult<Node> {
    let (rest, text) = recognize(pair(opt(char('-')), digit1))(input)?;
    let value = BigInt::parse_bytes(text.as_bytes(), 10).ok_or_else(|| err_at(input))?;
    Ok((rest, Node::Literal(Literal::Number(value))))
}

fn string_literal(input: &str) -> PResult<Node> {
    let (mut rest, _) = char('"')(input)?;
    let mut out = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            None => return Err(err_at(input)),
            Some('"') => return Ok((&rest[1..], Node::Literal(Literal::Str(out)))),
            Some('\\') => {
                let after = &rest[1..];
                match after.chars().next() {
                    Some('"') => {
                        out.push('"');
                        rest = &after[1..];
                    }
                    Some('\\') => {
                        out.push('\\');
                        rest = &after[1..];
                    }
                    Some('n') => {
                        out.push('\n');
                        rest = &after[1..];
                    }
                    Some('t') => {
                        out.push('\t');
                        rest = &after[1..];
                    }
                    Some('r') => {
                        out.push('\r');
                        rest = &after[1..];
                    }
                    Some('u') => {
                        let (r, c) = unicode_braces(&after[1..])?;
                        out.push(c);
                        rest = r;
                    }
                    _ => return Err(err_at(rest)),
                }
            }
            Some(c) => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
}

fn err_at(input: &str) -> nom::Err<VerboseError<&str>> {
    nom::Err::Error(VerboseError::from_error_kind(input, ErrorKind::Verify))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text() {
        let frags = parse("Hello world").unwrap();
        assert_eq!(
            frags,
            vec![Fragment::Text {
                text: "Hello world".to_string(),
                directives: vec![],
            }]
        );
    }

    #[test]
    fn test_dollar_escapes() {
        let frags = parse("pay $$5 or $5").unwrap();
        assert_eq!(
            frags,
            vec![Fragment::Text {
                text: "pay $5 or $5".to_string(),
                directives: vec![],
            }]
        );
    }

    #[test]
    fn test_metadata_directive() {
        let frags = parse("\\m{locale=en}Hello").unwrap();
        assert_eq!(
            frags,
            vec![Fragment::Text {
                text: "Hello".to_string(),
                directives: vec!["locale=en".to_string()],
            }]
        );
    }

    #[test]
    fn test_unicode_escape() {
        let frags = parse("transf\\u{e9}rer").unwrap();
        assert_eq!(
            frags,
            vec![Fragment::Text {
                text: "transférer".to_string(),
                directives: vec![],
            }]
        );
    }

    #[test]
    fn test_substitution_with_assertion_chain() {
        let frags = parse("${ equals(atIndex(1), atIndex(2)), quote(atIndex(3)) }").unwrap();
        assert_eq!(frags.len(), 1);
        match &frags[0] {
            Fragment::Substitution(Node::Substitution(exprs)) => {
                assert_eq!(exprs.len(), 2);
                assert_eq!(
                    exprs[1],
                    Node::call(
                        "quote",
                        vec![Node::call(
                            "atIndex",
                            vec![Node::Literal(Literal::Number(3.into()))]
                        )]
                    )
                );
            }
            other => panic!("expected substitution, got {:?}", other),
        }
    }

    #[test]
    fn test_literals() {
        let frags = parse("${ true }${ 0xabcd }${ -42 }${ \"hi\\n\" }").unwrap();
        let exprs: Vec<&Node> = frags
            .iter()
            .map(|f| match f {
                Fragment::Substitution(Node::Substitution(exprs)) => &exprs[0],
                other => panic!("expected substitution, got {:?}", other),
            })
            .collect();
        assert_eq!(exprs[0], &Node::Literal(Literal::Bool(true)));
        assert_eq!(exprs[1], &Node::Literal(Literal::Bytes(vec![0xab, 0xcd])));
        assert_eq!(exprs[2], &Node::Literal(Literal::Number((-42).into())));
        assert_eq!(exprs[3], &Node::Literal(Literal::Str("hi\n".to_string())));
    }

    #[test]
    fn test_mixed_template() {
        let frags = parse("\\m{locale=en}send ${ atIndex(1) } $$${ atIndex(2) }?").unwrap();
        assert_eq!(frags.len(), 5);
        assert_eq!(
            frags[2],
            Fragment::Text {
                text: " $".to_string(),
                directives: vec![],
            }
        );
    }

    #[test]
    fn test_unterminated_substitution_fails() {
        assert!(parse("${ atIndex(1) ").is_err());
        assert!(parse("${ atIndex(1 }").is_err());
    }

    #[test]
    fn test_unknown_escape_fails() {
        assert!(parse("bad \\q escape").is_err());
    }

    #[test]
    fn test_odd_hex_literal_fails() {
        assert!(parse("${ 0xabc }").is_err());
    }
}
