//! format-commit: localized message templates rendered into signable
//! byte payloads.
//!
//! A caller supplies a target address, a set of template sources (for
//! example one per locale), declared argument types, and raw argument
//! values. The crate renders every template, binds the template set and
//! the argument-type signature into a single deterministic `formatId`,
//! and packs the arguments into the exact byte payload a user signs. A
//! verifier holding the same template set can then check — without the
//! full text — that what the user approved matches these variants and
//! types.
//!
//! The pieces:
//! - template parser (text, `\m{key=value}` metadata directives, and
//!   `${ ... }` substitution expressions)
//! - strict typed evaluator with an inline-assertion idiom: every
//!   expression of a substitution runs left to right, only the last
//!   result renders
//! - a closed built-in registry (`atIndex`, `equals`, coercions, the
//!   generated `intN`/`uintN`/`bytesN` families, `formatUnits`, `quote`,
//!   and the hash functions)
//! - the commitment builder producing `formatId` and the packed payload
//!
//! Everything is synchronous, in-memory, and deterministic; independent
//! builds share only the immutable registry and may run in parallel.

pub mod ast;
pub mod commit;
pub mod crypto;
pub mod error;
pub mod eval;
pub mod functions;
pub mod normalize;
pub mod pack;
pub mod parser;
pub mod types;
pub mod value;

// Re-export the public surface
pub use ast::{Fragment, Literal, Node};
pub use commit::{build, Commitment, RenderedString};
pub use error::{FormatError, FormatResult};
pub use eval::evaluate;
pub use parser::parse;
pub use types::{ArgType, ParamType};
pub use value::{Metadata, RawValue, TypedValue};
