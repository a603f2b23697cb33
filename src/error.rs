use thiserror::Error;

use crate::abt::Term;

#[derive(Error, Debug)]
pub enum Error {
    /// Arity or slot-shape mismatch, or an ill-formed declaration.
    #[error("invalid construction: {0}")]
    InvalidConstruction(String),
    #[error("no parse for {input:?}")]
    NoParse { input: String },
    #[error("ambiguous parse for {input:?} ({} candidates): {candidates:?}", candidates.len())]
    AmbiguousParse { input: String, candidates: Vec<Term> },
    #[error("kind {0} is already declared")]
    DeclarationReuse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
