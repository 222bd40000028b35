pub mod interval;
pub mod region;
pub mod sequence_dictionary;
pub mod stringency;

// re-export for cleaner imports
pub use self::interval::Interval;
pub use self::region::{ReferenceRegion, UNBOUNDED_END};
pub use self::sequence_dictionary::{SequenceDictionary, SequenceRecord};
pub use self::stringency::ValidationStringency;
