use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("Invalid region {name}:{start}-{end}: start is greater than end")]
    InvalidBounds { name: String, start: u64, end: u64 },

    #[error("Error parsing region: {0}")]
    RegionParseError(String),

    #[error("Regions are on different contigs: {0} and {1}")]
    DifferentContigs(String, String),

    #[error("Sequence {name} has conflicting lengths in merged dictionaries: {left} and {right}")]
    IncompatibleSequence { name: String, left: u64, right: u64 },

    #[error("Sequence {0} appears more than once in the dictionary")]
    DuplicateSequence(String),
}
