use thiserror::Error;

/// Precondition failures detected before any clustering work begins.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DadaError {
    #[error("Different input lengths: {seqs} sequences, {abundances} abundances")]
    LengthMismatch { seqs: usize, abundances: usize },

    #[error("{name} matrix malformed: {rows} x {cols}, expected 4 x 4")]
    MatrixShape {
        name: &'static str,
        rows: usize,
        cols: usize,
    },

    #[error("{name} not length 1: {len}")]
    ScalarMultiplicity { name: &'static str, len: usize },

    #[error("Sequence {index} has invalid character {base:?} at position {pos}")]
    InvalidBase { index: usize, pos: usize, base: char },

    #[error("Sequence {index} is empty")]
    EmptySequence { index: usize },

    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, DadaError>;
