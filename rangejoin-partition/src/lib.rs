//! Partitioned genomic datasets.
//!
//! A [`GenomicDataset`] pairs a [`Partitioned`] collection of records with
//! the [`SequenceDictionary`](rangejoin_core::models::SequenceDictionary)
//! they refer to and a [`PartitionMap`] describing how they are laid out.
//! This crate provides the operations that establish and exploit that
//! layout:
//!
//! - range sorting by (contig, start), lexicographic or by contig rank
//! - even repartitioning of a sorted dataset
//! - co-partitioning one dataset onto another's partition bounds
//! - fixed-width genome binning with flanked per-bin processing
//!
//! ```rust
//! use rangejoin_core::models::{ReferenceRegion, SequenceDictionary, ValidationStringency};
//! use rangejoin_partition::GenomicDataset;
//!
//! let sequences = SequenceDictionary::from_lengths(vec![("chr1", 10_000), ("chr2", 5_000)]).unwrap();
//! let regions: Vec<ReferenceRegion> = vec![
//!     "chr2:100-200".parse().unwrap(),
//!     "chr1:500-900".parse().unwrap(),
//!     "chr1:100-150".parse().unwrap(),
//! ];
//! let dataset = GenomicDataset::from_vec(regions, 2, sequences, |r: &ReferenceRegion| vec![r.clone()]);
//!
//! let sorted = dataset.sort(Some(2), ValidationStringency::Strict).unwrap();
//! assert!(sorted.is_sorted());
//! assert_eq!(sorted.records().iter().next().map(|r| r.start), Some(100));
//! ```

pub mod bins;
pub mod copartition;
pub mod dataset;
pub mod errors;
pub mod ordering;
pub mod partition_map;
pub mod partitioned;
pub mod repartition;
pub mod sort;

// re-exports
pub use self::bins::GenomeBins;
pub use self::copartition::{BoundaryTable, PartitionBoundary, Replication};
pub use self::dataset::{GenomicDataset, RegionFn};
pub use self::errors::PartitionError;
pub use self::ordering::{ContigKey, RegionOrdering, SortKey, SortStrategy};
pub use self::partition_map::{PartitionBound, PartitionBounds, PartitionMap};
pub use self::partitioned::{Broadcast, Partitioned, broadcast};
pub use self::sort::SortOptions;
