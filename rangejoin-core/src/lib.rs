//! Core models shared by every rangejoin crate.
//!
//! - [`ReferenceRegion`](models::ReferenceRegion): an immutable half-open span on a named contig
//! - [`SequenceDictionary`](models::SequenceDictionary): the contigs a dataset refers to, with
//!   lengths and optional canonical ranks
//! - [`Interval`](models::Interval): the bare `[start, end)` + payload unit stored in overlap indexes
//! - [`ValidationStringency`](models::ValidationStringency): what to do with records that cannot
//!   be placed on the genome
//!
//! ```rust
//! use rangejoin_core::models::ReferenceRegion;
//!
//! let peak: ReferenceRegion = "chr1:100-200".parse().unwrap();
//! let gene = ReferenceRegion::new("chr1", 150, 400).unwrap();
//!
//! assert!(peak.overlaps(&gene));
//! assert_eq!(peak.pad(10).pad(-10), peak);
//! ```

pub mod errors;
pub mod models;
pub mod utils;
