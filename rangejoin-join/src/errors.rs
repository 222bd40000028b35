use rangejoin_core::errors::RegionError;
use rangejoin_partition::PartitionError;
use thiserror::Error;

use crate::config::JoinConfigError;
use crate::output::JoinType;

#[derive(Error, Debug)]
pub enum JoinError {
    #[error("Broadcast joins support inner and right outer joins, not {0:?}")]
    UnsupportedBroadcastJoin(JoinType),
    #[error("Partition {partition} of the {side} side is not sorted by start")]
    UnsortedPartition { side: &'static str, partition: usize },
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Config(#[from] JoinConfigError),
}

pub type JoinResult<T> = std::result::Result<T, JoinError>;
