//! Static interval overlap indexes.
//!
//! Both the broadcast join (one global index replicated to every worker) and
//! partition-local processing build their indexes from the types here. All
//! overlap computation for the workspace should live in this crate.
//!
//! ```rust
//! use rangejoin_overlaprs::{IntervalArray, Overlapper, Interval};
//!
//! let peaks = vec![
//!     Interval { start: 100u64, end: 200, val: "peak1" },
//!     Interval { start: 150, end: 300, val: "peak2" },
//!     Interval { start: 400, end: 500, val: "peak3" },
//! ];
//! let index = IntervalArray::build(peaks);
//!
//! assert_eq!(index.find(180, 250).len(), 2);
//! ```

/// Augmented Interval List implementation.
///
/// See [`AIList`] for details.
pub mod ailist;

/// Sorted interval array.
///
/// See [`IntervalArray`] for details.
pub mod interval_array;

/// Genome-wide indexing, one overlapper per contig.
pub mod contig_index;

/// Core traits for overlap operations.
///
/// See [`Overlapper`] for the main trait.
pub mod traits;

// re-exports
pub use self::ailist::AIList;
pub use self::contig_index::{ContigIndex, IntoContigIndex};
pub use self::interval_array::IntervalArray;
pub use self::traits::{Interval, Overlapper};

/// The per-contig overlap structure to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OverlapperType {
    /// Augmented Interval List; best on deep, high-coverage inputs.
    #[cfg_attr(feature = "serde", serde(rename = "ailist"))]
    AIList,
    /// Single sorted run; hits come back in start order.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "interval_array"))]
    IntervalArray,
}
