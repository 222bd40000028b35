use rangejoin_core::errors::RegionError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    // configuration errors
    #[error("Ranked sorting requires a sequence dictionary where every contig has a rank")]
    MissingContigOrdering,
    #[error("Co-partitioning target has no partition map; sort it first")]
    MissingPartitionMap,
    #[error("Even repartitioning requires a sorted dataset")]
    UnsortedDataset,
    #[error("Partition count must be greater than zero")]
    ZeroPartitions,
    #[error("Bin size must be greater than zero")]
    InvalidBinSize,

    // data validity errors
    #[error("Record in partition {partition} maps to no reference region")]
    UnmappedRecord { partition: usize },
    #[error("Record maps to {count} regions ({regions}); a single sort key is required")]
    MultiMappedRecord { count: usize, regions: String },
    #[error("Contig {0} has no rank in the sequence dictionary")]
    MissingContigRank(String),

    // structural invariants
    #[error("Partition map has {slots} slots but the dataset has {partitions} partitions")]
    PartitionMapLengthMismatch { slots: usize, partitions: usize },
    #[error("Cannot zip collections with {left} and {right} partitions")]
    PartitionCountMismatch { left: usize, right: usize },
    #[error("Destination partition {destination} is out of range for {partitions} partitions")]
    InvalidDestination { destination: usize, partitions: usize },

    #[error(transparent)]
    Region(#[from] RegionError),
}
