//! Input records and validated detection data

pub mod detection;
pub mod parser;

pub use detection::{Detection, DetectionTriple, InitialGuess};
pub use parser::{DetectionRecord, InitialGuessRecord, TripleRecord};
