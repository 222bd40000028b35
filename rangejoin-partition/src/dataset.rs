//! Partitioned genomic records with their reference context.

use std::fmt;
use std::sync::Arc;

use log::debug;
use rangejoin_core::models::{ReferenceRegion, SequenceDictionary};

use crate::copartition::Replication;
use crate::errors::PartitionError;
use crate::ordering::RegionOrdering;
use crate::partition_map::PartitionMap;
use crate::partitioned::Partitioned;

/// Extracts the reference regions a record covers.
pub type RegionFn<T> = Arc<dyn Fn(&T) -> Vec<ReferenceRegion> + Send + Sync>;

///
/// A partitioned collection of records, the sequence dictionary they refer
/// to, and what is known about their layout.
///
/// Every operation that moves records between partitions either produces a
/// fresh [`PartitionMap`] or resets it to [`PartitionMap::Unknown`].
///
/// A co-partitioned dataset may hold several copies of one record. Such a
/// dataset is replicated until [`dereplicate`](Self::dereplicate) runs;
/// operations that would otherwise see a record more than once run it
/// themselves.
///
pub struct GenomicDataset<T> {
    records: Partitioned<T>,
    sequences: SequenceDictionary,
    partition_map: PartitionMap,
    region_fn: RegionFn<T>,
    replication: Option<Replication>,
}

impl<T: Clone> Clone for GenomicDataset<T> {
    fn clone(&self) -> Self {
        GenomicDataset {
            records: self.records.clone(),
            sequences: self.sequences.clone(),
            partition_map: self.partition_map.clone(),
            region_fn: Arc::clone(&self.region_fn),
            replication: self.replication.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for GenomicDataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenomicDataset")
            .field("records", &self.records)
            .field("sequences", &self.sequences)
            .field("partition_map", &self.partition_map)
            .field("replicated", &self.replication.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> GenomicDataset<T>
where
    T: Send + Sync,
{
    pub fn new<F>(records: Partitioned<T>, sequences: SequenceDictionary, region_fn: F) -> Self
    where
        F: Fn(&T) -> Vec<ReferenceRegion> + Send + Sync + 'static,
    {
        Self::with_region_fn(records, sequences, Arc::new(region_fn))
    }

    pub fn with_region_fn(
        records: Partitioned<T>,
        sequences: SequenceDictionary,
        region_fn: RegionFn<T>,
    ) -> Self {
        GenomicDataset {
            records,
            sequences,
            partition_map: PartitionMap::Unknown,
            region_fn,
            replication: None,
        }
    }

    /// Spread `items` over `num_partitions` contiguous partitions.
    pub fn from_vec<F>(
        items: Vec<T>,
        num_partitions: usize,
        sequences: SequenceDictionary,
        region_fn: F,
    ) -> Self
    where
        F: Fn(&T) -> Vec<ReferenceRegion> + Send + Sync + 'static,
    {
        Self::new(Partitioned::from_vec(items, num_partitions), sequences, region_fn)
    }

    /// Attach a partition map; it must have one slot per partition.
    pub fn with_partition_map(mut self, partition_map: PartitionMap) -> Result<Self, PartitionError> {
        partition_map.validate(self.records.num_partitions())?;
        self.partition_map = partition_map;
        Ok(self)
    }

    pub fn records(&self) -> &Partitioned<T> {
        &self.records
    }

    pub fn into_records(self) -> Partitioned<T> {
        self.records
    }

    pub fn sequences(&self) -> &SequenceDictionary {
        &self.sequences
    }

    pub fn partition_map(&self) -> &PartitionMap {
        &self.partition_map
    }

    pub fn region_fn(&self) -> &RegionFn<T> {
        &self.region_fn
    }

    pub fn is_sorted(&self) -> bool {
        self.partition_map.is_sorted()
    }

    /// Whether some records may be present in more than one partition.
    pub fn is_replicated(&self) -> bool {
        self.replication.is_some()
    }

    pub(crate) fn with_replication(mut self, replication: Replication) -> Self {
        self.replication = Some(replication);
        self
    }

    ///
    /// Keep one copy of every record, in the lowest partition it was
    /// co-partitioned into.
    ///
    /// The partition map is recomputed from the records that remain.
    /// A dataset that is not replicated is returned unchanged.
    ///
    pub fn dereplicate(self) -> Self {
        let GenomicDataset {
            records,
            sequences,
            partition_map,
            region_fn,
            replication,
        } = self;
        let Some(replication) = replication else {
            return GenomicDataset {
                records,
                sequences,
                partition_map,
                region_fn,
                replication: None,
            };
        };

        let before = records.count();
        let records = {
            let region_fn = Arc::clone(&region_fn);
            let replication = replication.clone();
            records.map_partitions_with_index(move |partition, records| {
                records
                    .into_iter()
                    .filter(|record| {
                        replication.primary_partition(&region_fn(record)) == Some(partition)
                    })
                    .collect()
            })
        };
        debug!(
            "Dropped {} replicated copies, {} records remain",
            before - records.count(),
            records.count()
        );

        let partition_map = {
            let region_fn = Arc::clone(&region_fn);
            PartitionMap::compute(&records, move |r: &T| region_fn(r), replication.ordering())
        };
        GenomicDataset {
            records,
            sequences,
            partition_map,
            region_fn,
            replication: None,
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.records.num_partitions()
    }

    pub fn count(&self) -> usize {
        self.records.count()
    }

    pub fn regions_of(&self, record: &T) -> Vec<ReferenceRegion> {
        (self.region_fn)(record)
    }

    /// Same dictionary and region function, new records and map.
    pub fn replace_records(
        self,
        records: Partitioned<T>,
        partition_map: PartitionMap,
    ) -> Result<Self, PartitionError> {
        partition_map.validate(records.num_partitions())?;
        Ok(GenomicDataset {
            records,
            sequences: self.sequences,
            partition_map,
            region_fn: self.region_fn,
            replication: None,
        })
    }

    pub fn with_sequences(mut self, sequences: SequenceDictionary) -> Self {
        self.sequences = sequences;
        self
    }

    /// Apply `f` to every partition. The partition map is dropped.
    pub fn transform<F>(self, f: F) -> Self
    where
        F: Fn(Vec<T>) -> Vec<T> + Send + Sync,
    {
        let this = self.dereplicate();
        GenomicDataset {
            records: this.records.map_partitions(f),
            sequences: this.sequences,
            partition_map: PartitionMap::Unknown,
            region_fn: this.region_fn,
            replication: None,
        }
    }

    ///
    /// Apply `f` to every partition, keeping the partition map.
    ///
    /// `f` must not reorder records across the sort order nor move them
    /// outside their partition's bounds.
    ///
    pub fn transform_preserving_order<F>(self, f: F) -> Self
    where
        F: Fn(Vec<T>) -> Vec<T> + Send + Sync,
    {
        let this = self.dereplicate();
        GenomicDataset {
            records: this.records.map_partitions(f),
            sequences: this.sequences,
            partition_map: this.partition_map,
            region_fn: this.region_fn,
            replication: None,
        }
    }

    /// Map every record into a new type. The partition map is dropped.
    pub fn map_records<U, F, G>(self, f: F, region_fn: G) -> GenomicDataset<U>
    where
        U: Send + Sync,
        F: Fn(T) -> U + Send + Sync,
        G: Fn(&U) -> Vec<ReferenceRegion> + Send + Sync + 'static,
    {
        let this = self.dereplicate();
        GenomicDataset::new(
            this.records
                .map_partitions(|p| p.into_iter().map(&f).collect()),
            this.sequences,
            region_fn,
        )
    }

    /// Concatenate partitions and merge dictionaries. The partition map is dropped.
    pub fn union(self, other: GenomicDataset<T>) -> Result<Self, PartitionError> {
        let (this, other) = (self.dereplicate(), other.dereplicate());
        let sequences = this.sequences.merge(&other.sequences)?;
        Ok(GenomicDataset {
            records: this.records.union(other.records),
            sequences,
            partition_map: PartitionMap::Unknown,
            region_fn: this.region_fn,
            replication: None,
        })
    }

    ///
    /// Keep records with at least one region overlapping any of `queries`.
    ///
    /// On a sorted dataset, partitions whose bounds rule out every query are
    /// emptied without being scanned, and the partition map is recomputed
    /// for what remains.
    ///
    pub fn filter_by_overlapping_regions(self, queries: &[ReferenceRegion]) -> Self {
        let this = self.dereplicate();
        let candidates: Option<Vec<bool>> = this.partition_map.bounds().map(|bounds| {
            let ordering = RegionOrdering::new(bounds.strategy(), &this.sequences)
                .unwrap_or_else(|_| RegionOrdering::lexicographic());
            let mut keep = vec![false; bounds.len()];
            for query in queries {
                for i in this
                    .partition_map
                    .candidate_partitions(query, &ordering)
                    .unwrap_or_default()
                {
                    keep[i] = true;
                }
            }
            keep
        });
        if let Some(keep) = &candidates {
            debug!(
                "Scanning {} of {} partitions for {} queries",
                keep.iter().filter(|k| **k).count(),
                keep.len(),
                queries.len()
            );
        }

        let region_fn = Arc::clone(&this.region_fn);
        let records = this.records.map_partitions_with_index(|i, partition| {
            if let Some(keep) = &candidates {
                if !keep.get(i).copied().unwrap_or(true) {
                    return Vec::new();
                }
            }
            partition
                .into_iter()
                .filter(|record| {
                    region_fn(record)
                        .iter()
                        .any(|r| queries.iter().any(|q| q.overlaps(r)))
                })
                .collect()
        });

        let partition_map = match this.partition_map.bounds() {
            Some(bounds) => {
                let ordering = RegionOrdering::new(bounds.strategy(), &this.sequences)
                    .unwrap_or_else(|_| RegionOrdering::lexicographic());
                let region_fn = Arc::clone(&this.region_fn);
                PartitionMap::compute(&records, move |r: &T| region_fn(r), &ordering)
            }
            None => PartitionMap::Unknown,
        };

        GenomicDataset {
            records,
            sequences: this.sequences,
            partition_map,
            region_fn: this.region_fn,
            replication: None,
        }
    }

    pub fn filter_by_overlapping_region(self, query: &ReferenceRegion) -> Self {
        self.filter_by_overlapping_regions(std::slice::from_ref(query))
    }
}

impl<T> GenomicDataset<T>
where
    T: Clone + Send + Sync,
{
    /// Records with replicated copies dropped, leaving `self` untouched.
    pub fn primary_records(&self) -> Partitioned<T> {
        self.clone().dereplicate().into_records()
    }

    /// One `(region, record)` entry per region of each record.
    pub fn flatten_by_regions(&self) -> Partitioned<(ReferenceRegion, T)> {
        let region_fn = Arc::clone(&self.region_fn);
        self.primary_records().map_partitions(move |partition| {
            partition
                .into_iter()
                .flat_map(|record| {
                    region_fn(&record)
                        .into_iter()
                        .map(|r| (r, record.clone()))
                        .collect::<Vec<_>>()
                })
                .collect()
        })
    }
}
