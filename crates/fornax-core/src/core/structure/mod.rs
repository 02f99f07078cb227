//! Secondary-structure primitives used to build and recolor structure graphs.
//!
//! The scene and trajectory engines only ever talk to these functions through the
//! [`toolkit::StructureToolkit`] trait; [`toolkit::DefaultToolkit`] wires up the
//! implementations in this module.

pub mod elements;
pub mod layout;
pub mod pairtable;
pub mod toolkit;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("Unbalanced bracket '{bracket}' at position {position}")]
    Unbalanced { bracket: char, position: usize },

    #[error("Unexpected character '{character}' at position {position}")]
    InvalidCharacter { character: char, position: usize },

    #[error("Position {position} is outside a structure of length {length}")]
    OutOfRange { position: usize, length: usize },

    #[error("Cannot pair position {0} with itself")]
    SelfPair(usize),

    #[error("Sequence length {sequence} does not match structure length {structure}")]
    LengthMismatch { sequence: usize, structure: usize },

    #[error("Malformed pairtable: {0}")]
    MalformedPairtable(String),

    #[error("Crossing pairs need more than {0} bracket levels to be written as dot-bracket")]
    TooManyCrossingLevels(usize),
}
