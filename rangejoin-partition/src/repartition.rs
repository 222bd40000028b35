use std::sync::Arc;

use log::info;

use crate::dataset::GenomicDataset;
use crate::errors::PartitionError;
use crate::ordering::RegionOrdering;
use crate::partition_map::PartitionMap;

impl<T> GenomicDataset<T>
where
    T: Send + Sync,
{
    ///
    /// Rebalance a sorted dataset into `num_partitions` partitions of
    /// near-equal size, keeping the global order.
    ///
    /// With `C` records the effective partition count is `min(C, n)`; record
    /// `i` (in global order) goes to partition `floor(i * k / C)`. An empty
    /// dataset is returned unchanged.
    ///
    pub fn evenly_repartition(self, num_partitions: usize) -> Result<Self, PartitionError> {
        let source = self.dereplicate();
        let strategy = match source.partition_map().bounds() {
            Some(bounds) => bounds.strategy(),
            None => return Err(PartitionError::UnsortedDataset),
        };
        if num_partitions == 0 {
            return Err(PartitionError::ZeroPartitions);
        }

        let counts = source.records().collect_partition_summaries(|_, p| p.len());
        let total: usize = counts.iter().sum();
        if total == 0 {
            return Ok(source);
        }
        let offsets: Vec<usize> = counts
            .iter()
            .scan(0, |acc, &c| {
                let offset = *acc;
                *acc += c;
                Some(offset)
            })
            .collect();
        let k = total.min(num_partitions);

        let ordering = RegionOrdering::new(strategy, source.sequences())?;
        let region_fn = Arc::clone(source.region_fn());
        let sequences = source.sequences().clone();

        let rebalanced = source
            .into_records()
            .map_partitions_with_index(|p, records| {
                records
                    .into_iter()
                    .enumerate()
                    .map(|(i, record)| (offsets[p] + i, record))
                    .collect()
            })
            .repartition_and_sort_within_partitions(k, |(index, _)| {
                let destination = (*index as u128 * k as u128 / total as u128) as usize;
                (destination.min(k - 1), *index)
            })?
            .map_partitions(|p| p.into_iter().map(|(_, record)| record).collect());

        let map = {
            let region_fn = Arc::clone(&region_fn);
            PartitionMap::compute(&rebalanced, move |r: &T| region_fn(r), &ordering)
        };
        info!("Evenly repartitioned {total} records into {k} partitions");

        GenomicDataset::with_region_fn(rebalanced, sequences, region_fn).with_partition_map(map)
    }
}
