//! Region joins over partitioned genomic datasets.
//!
//! Two strategies are provided:
//!
//! - **broadcast**: the left side is indexed once and shared with every
//!   partition of the right side ([`BroadcastRegionJoin`], [`BroadcastIndex`]).
//!   Supports inner and right outer joins, optionally grouped by the right
//!   record.
//! - **shuffle**: both sides are range partitioned identically and merged
//!   partition by partition in one pass ([`ShuffleRegionJoin`]). Supports
//!   inner, left, right and full outer joins, optionally grouped by either
//!   side.
//!
//! Left intervals can be padded by a flank before matching; reported
//! records keep their original intervals.
//!
//! ```rust
//! use rangejoin_core::models::{ReferenceRegion, SequenceDictionary};
//! use rangejoin_join::{JoinConfig, ShuffleRegionJoin};
//! use rangejoin_partition::GenomicDataset;
//!
//! let sequences = SequenceDictionary::from_lengths(vec![("chr1", 1_000)]).unwrap();
//! let genes = GenomicDataset::from_vec(
//!     vec![ReferenceRegion::new("chr1", 0, 100).unwrap()],
//!     1,
//!     sequences.clone(),
//!     |r: &ReferenceRegion| vec![r.clone()],
//! );
//! let reads = GenomicDataset::from_vec(
//!     vec![
//!         ReferenceRegion::new("chr1", 10, 20).unwrap(),
//!         ReferenceRegion::new("chr1", 500, 510).unwrap(),
//!     ],
//!     2,
//!     sequences,
//!     |r: &ReferenceRegion| vec![r.clone()],
//! );
//!
//! let joined = genes.shuffle_region_join(reads, &JoinConfig::default()).unwrap();
//! assert_eq!(joined.count(), 1);
//! ```

pub mod broadcast;
pub mod config;
pub mod errors;
pub mod merge;
pub mod output;
pub mod reconcile;
pub mod shuffle;

// re-exports
pub use self::broadcast::{BroadcastIndex, BroadcastRegionJoin, broadcast_join};
pub use self::config::{JoinConfig, JoinConfigError};
pub use self::errors::{JoinError, JoinResult};
pub use self::output::{GroupBy, JoinRow, JoinType};
pub use self::shuffle::{ShuffleRegionJoin, shuffle_join};
