//! Filter Composition
//!
//! Two independently compiled filters are joined into one program whose
//! verdict is the short-circuit AND or OR of theirs. The first program's
//! return instructions are rewritten so that control falls into the second
//! program only when the first verdict does not already decide the outcome:
//!
//! ```text
//!            AND                              OR
//! ret #k>0 -> jmp <start of B>    ret #0   -> jmp <start of B>
//! ret #0   -> ret #0              ret #k>0 -> ret #k
//! ret a    -> jneq #0,1 ; ret a   ret a    -> jeq #0,1 ; ret a
//! ```
//!
//! The second program is appended unchanged; its jumps are relative and it
//! stays contiguous.

mod compose;

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

pub use compose::{combine, combine_sock_filters};

use crate::bytecode::{DecodeError, EncodeError};

/// Boolean combinator applied by [`combine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ChainType {
    /// No combinator selected
    #[default]
    Undefined = 0,
    /// Accept only if both filters accept
    And = 1,
    /// Accept if either filter accepts
    Or = 2,
}

impl ChainType {
    /// Check if this is a combinator [`combine`] accepts.
    #[inline]
    pub const fn is_defined(self) -> bool {
        !matches!(self, Self::Undefined)
    }
}

impl From<u32> for ChainType {
    /// Out-of-range values map to [`ChainType::Undefined`].
    fn from(value: u32) -> Self {
        match value {
            1 => Self::And,
            2 => Self::Or,
            _ => Self::Undefined,
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Undefined => "undefined",
        };
        f.write_str(s)
    }
}

/// A string that names no combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected `and` or `or`")]
pub struct ParseChainTypeError;

impl FromStr for ChainType {
    type Err = ParseChainTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("and") {
            Ok(Self::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(Self::Or)
        } else {
            Err(ParseChainTypeError)
        }
    }
}

/// Errors that can occur while composing filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The combinator is neither AND nor OR.
    #[error("`{0}` is not a filter combinator")]
    InvalidCombinator(ChainType),

    /// One of the raw input programs does not decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The composed program cannot be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
