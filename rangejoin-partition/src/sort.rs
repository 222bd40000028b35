//! Range sorting of genomic datasets.
//!
//! Records are keyed by (contig position, start), range-partitioned on exact
//! quantiles of those keys and sorted within each partition. The resulting
//! dataset carries a [`PartitionMap`] describing every partition's bounds.

use std::sync::Arc;

use log::info;
use rangejoin_core::models::ValidationStringency;
use rayon::slice::ParallelSliceMut;

use crate::dataset::GenomicDataset;
use crate::errors::PartitionError;
use crate::ordering::{RegionOrdering, SortKey, SortStrategy};
use crate::partition_map::PartitionMap;

/// How to sort a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOptions {
    /// Target partition count; the dataset's current count when unset.
    pub partitions: Option<usize>,
    pub strategy: SortStrategy,
    pub stringency: ValidationStringency,
    /// Compute a partition map for the result.
    pub record_bounds: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        SortOptions {
            partitions: None,
            strategy: SortStrategy::Ranked,
            stringency: ValidationStringency::Lenient,
            record_bounds: true,
        }
    }
}

impl<T> GenomicDataset<T>
where
    T: Send + Sync,
{
    /// Sort by contig rank, then start.
    pub fn sort(
        self,
        partitions: Option<usize>,
        stringency: ValidationStringency,
    ) -> Result<Self, PartitionError> {
        self.sort_with(&SortOptions {
            partitions,
            strategy: SortStrategy::Ranked,
            stringency,
            record_bounds: true,
        })
    }

    /// Sort by contig name, then start.
    pub fn sort_lexicographically(
        self,
        partitions: Option<usize>,
        stringency: ValidationStringency,
    ) -> Result<Self, PartitionError> {
        self.sort_with(&SortOptions {
            partitions,
            strategy: SortStrategy::Lexicographic,
            stringency,
            record_bounds: true,
        })
    }

    ///
    /// Sort with explicit options.
    ///
    /// Records with no region, or (under ranked ordering) on a contig without
    /// a rank, are handled by `options.stringency`. A record with more than
    /// one region has no single sort key and always fails.
    ///
    pub fn sort_with(self, options: &SortOptions) -> Result<Self, PartitionError> {
        let source = self.dereplicate();
        let ordering = RegionOrdering::new(options.strategy, source.sequences())?;
        let num_partitions = options
            .partitions
            .unwrap_or_else(|| source.num_partitions())
            .max(1);
        let stringency = options.stringency;
        let region_fn = Arc::clone(source.region_fn());
        let sequences = source.sequences().clone();
        let input_count = source.count();

        // STEP 1: key every record, dropping what cannot be placed
        let keyed = source
            .into_records()
            .try_map_partitions_with_index(|partition, records| {
                let mut keyed = Vec::with_capacity(records.len());
                for record in records {
                    let regions = region_fn(&record);
                    match regions.as_slice() {
                        [] => stringency.check(PartitionError::UnmappedRecord { partition })?,
                        [region] => match ordering.key(region) {
                            Some(key) => keyed.push((key, record)),
                            None => stringency.check(PartitionError::MissingContigRank(
                                region.reference_name.clone(),
                            ))?,
                        },
                        _ => {
                            return Err(PartitionError::MultiMappedRecord {
                                count: regions.len(),
                                regions: regions
                                    .iter()
                                    .map(|r| r.to_string())
                                    .collect::<Vec<_>>()
                                    .join(", "),
                            });
                        }
                    }
                }
                Ok(keyed)
            })?;

        // STEP 2: range boundaries from exact quantiles of the keys
        let mut keys: Vec<SortKey> = keyed
            .collect_partition_summaries(|_, p| {
                p.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>()
            })
            .into_iter()
            .flatten()
            .collect();
        keys.par_sort();
        let boundaries = range_boundaries(&keys, num_partitions);

        // STEP 3: shuffle and sort
        let sorted = keyed
            .repartition_and_sort_within_partitions(num_partitions, |(key, _)| {
                (boundaries.partition_point(|b| b <= key), key.clone())
            })?
            .map_partitions(|p| p.into_iter().map(|(_, record)| record).collect());

        let partition_map = if options.record_bounds {
            let region_fn = Arc::clone(&region_fn);
            PartitionMap::compute(&sorted, move |r: &T| region_fn(r), &ordering)
        } else {
            PartitionMap::Unknown
        };

        info!(
            "Sorted {} of {} records into {} partitions ({:?})",
            sorted.count(),
            input_count,
            num_partitions,
            options.strategy
        );

        GenomicDataset::with_region_fn(sorted, sequences, region_fn).with_partition_map(partition_map)
    }
}

///
/// Split points for `n` range partitions over sorted `keys`.
///
/// Returns `n - 1` keys; a record goes to the number of split points less
/// than or equal to its key. With fewer keys than partitions the trailing
/// partitions stay empty.
///
fn range_boundaries(keys: &[SortKey], n: usize) -> Vec<SortKey> {
    if keys.is_empty() {
        return Vec::new();
    }
    (1..n)
        .filter_map(|i| {
            let idx = i * keys.len() / n;
            keys.get(idx).cloned()
        })
        .collect()
}
