//! Routing records onto another dataset's partition layout.
//!
//! A [`BoundaryTable`] turns a [`PartitionBounds`] into per-contig routing
//! entries that together cover every position of every contig, so any
//! region can be sent to at least one partition. Regions crossing an entry
//! boundary are sent to every partition they touch. The resulting dataset
//! remembers how it was routed (a [`Replication`]), so the extra copies can
//! be dropped again with [`GenomicDataset::dereplicate`].

use std::sync::Arc;

use fxhash::FxHashMap;
use log::{debug, info};
use rangejoin_core::models::{ReferenceRegion, SequenceDictionary, UNBOUNDED_END, ValidationStringency};

use crate::dataset::GenomicDataset;
use crate::errors::PartitionError;
use crate::ordering::{ContigKey, RegionOrdering, SortKey};
use crate::partition_map::{PartitionBounds, PartitionMap};
use crate::partitioned::{Broadcast, broadcast};

/// One routing entry: positions in `[start, end)` of a contig go to `partition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionBoundary {
    pub start: u64,
    pub end: u64,
    pub partition: usize,
}

///
/// Per-contig routing table derived from a partition map.
///
/// Entries on one contig are ordered by start and leave no gaps: the first
/// starts at 0, the last is open-ended, and interior gaps are absorbed by
/// the preceding entry. Contigs the map never saw route to the last
/// partition of the closest preceding observed contig.
///
#[derive(Debug, Clone)]
pub struct BoundaryTable {
    by_contig: FxHashMap<String, Vec<PartitionBoundary>>,
    observed: Vec<(ContigKey, usize)>,
    first_partition: usize,
    num_partitions: usize,
    ordering: RegionOrdering,
}

impl BoundaryTable {
    pub fn from_partition_map(
        bounds: &PartitionBounds,
        sequences: &SequenceDictionary,
    ) -> Result<Self, PartitionError> {
        let ordering = RegionOrdering::new(bounds.strategy(), sequences)?;
        let mut by_contig: FxHashMap<String, Vec<PartitionBoundary>> = FxHashMap::default();

        // STEP 1: raw entries, splitting partitions that span contigs
        for (partition, (lo, hi)) in bounds.non_empty() {
            if lo.same_contig(hi) {
                by_contig
                    .entry(lo.reference_name.clone())
                    .or_default()
                    .push(PartitionBoundary {
                        start: lo.start,
                        end: hi.end,
                        partition,
                    });
            } else {
                by_contig
                    .entry(lo.reference_name.clone())
                    .or_default()
                    .push(PartitionBoundary {
                        start: lo.start,
                        end: UNBOUNDED_END,
                        partition,
                    });
                by_contig
                    .entry(hi.reference_name.clone())
                    .or_default()
                    .push(PartitionBoundary {
                        start: 0,
                        end: hi.end,
                        partition,
                    });
            }
        }

        // STEP 2: close the gaps so every position is covered
        for entries in by_contig.values_mut() {
            entries.sort_by_key(|e| (e.start, e.partition));
            let n = entries.len();
            for i in 0..n.saturating_sub(1) {
                let next_start = entries[i + 1].start;
                if entries[i].end < next_start {
                    entries[i].end = next_start;
                }
            }
            if let Some(first) = entries.first_mut() {
                first.start = 0;
            }
            if let Some(last) = entries.last_mut() {
                last.end = UNBOUNDED_END;
            }
        }

        // STEP 3: contig order for routing unobserved contigs
        let mut observed: Vec<(ContigKey, usize)> = by_contig
            .iter()
            .map(|(name, entries)| {
                let last = entries.iter().map(|e| e.partition).max().unwrap_or(0);
                (ordering.contig_key_or_name(name), last)
            })
            .collect();
        observed.sort();

        let first_partition = bounds.non_empty().map(|(i, _)| i).next().unwrap_or(0);

        Ok(BoundaryTable {
            by_contig,
            observed,
            first_partition,
            num_partitions: bounds.len(),
            ordering,
        })
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    pub fn ordering(&self) -> &RegionOrdering {
        &self.ordering
    }

    pub fn boundaries(&self, contig: &str) -> Option<&[PartitionBoundary]> {
        self.by_contig.get(contig).map(|e| e.as_slice())
    }

    ///
    /// Partitions a region must be sent to, in ascending order.
    ///
    /// Never empty for a table built from a non-empty map. A zero-width
    /// region goes to the entry containing its position.
    ///
    pub fn destinations(&self, region: &ReferenceRegion) -> Vec<usize> {
        let Some(entries) = self.by_contig.get(&region.reference_name) else {
            return vec![self.fallback_partition(&region.reference_name)];
        };

        // entries are ordered by start; only those starting before the
        // region's end can touch it
        let reach = region.end.max(region.start.saturating_add(1));
        let candidates = entries.partition_point(|e| e.start < reach);
        let mut destinations: Vec<usize> = entries[..candidates]
            .iter()
            .filter(|e| {
                if region.start == region.end {
                    e.start <= region.start && region.start < e.end
                } else {
                    e.start < region.end && region.start < e.end
                }
            })
            .map(|e| e.partition)
            .collect();

        if destinations.is_empty() {
            // only a region starting at the unbounded end gets here
            if let Some(last) = entries.last() {
                destinations.push(last.partition);
            }
        }
        destinations.sort_unstable();
        destinations.dedup();
        destinations
    }

    /// Destinations of `region` padded by `flank` on both sides.
    pub fn route(&self, region: &ReferenceRegion, flank: u64) -> Vec<usize> {
        self.destinations(&region.pad(flank_delta(flank)))
    }

    fn fallback_partition(&self, contig: &str) -> usize {
        let key = self.ordering.contig_key_or_name(contig);
        let preceding = self.observed.partition_point(|(k, _)| *k < key);
        match preceding.checked_sub(1) {
            Some(i) => self.observed[i].1,
            None => self.first_partition,
        }
    }
}

///
/// How a co-partitioned dataset was routed.
///
/// A record routed to several partitions has exactly one primary copy: the
/// one in the lowest partition any of its padded regions was sent to.
///
#[derive(Debug, Clone)]
pub struct Replication {
    table: Broadcast<BoundaryTable>,
    flank_size: u64,
}

impl Replication {
    pub fn new(table: Broadcast<BoundaryTable>, flank_size: u64) -> Self {
        Replication { table, flank_size }
    }

    pub fn flank_size(&self) -> u64 {
        self.flank_size
    }

    pub fn ordering(&self) -> &RegionOrdering {
        self.table.ordering()
    }

    /// Partition holding the primary copy of a record covering `regions`.
    pub fn primary_partition(&self, regions: &[ReferenceRegion]) -> Option<usize> {
        regions
            .iter()
            .flat_map(|r| self.table.route(r, self.flank_size))
            .min()
    }
}

/// Convert a flank size into a signed padding amount.
pub fn flank_delta(flank: u64) -> i64 {
    i64::try_from(flank).unwrap_or(i64::MAX)
}

impl<T> GenomicDataset<T>
where
    T: Clone + Send + Sync,
{
    ///
    /// Move this dataset's records onto `target`'s partition layout.
    ///
    /// Each record is sent to every target partition its regions (padded by
    /// `flank_size`) touch, so records straddling a boundary are replicated.
    /// Within each partition records are sorted by their lowest region. The
    /// result inherits `target`'s partition map and is marked as replicated.
    /// Copies left over from an earlier co-partitioning are dropped first.
    ///
    pub fn copartition_by_reference_region<U>(
        self,
        target: &GenomicDataset<U>,
        flank_size: u64,
        stringency: ValidationStringency,
    ) -> Result<Self, PartitionError>
    where
        U: Send + Sync,
    {
        let source = self.dereplicate();
        let bounds = target
            .partition_map()
            .bounds()
            .ok_or(PartitionError::MissingPartitionMap)?;
        let sequences = source.sequences().merge(target.sequences())?;
        let table = broadcast(BoundaryTable::from_partition_map(bounds, target.sequences())?);
        let num_partitions = table.num_partitions().max(1);
        let region_fn = Arc::clone(source.region_fn());
        let input_count = source.count();

        let routed = {
            let table = table.clone();
            let region_fn = Arc::clone(&region_fn);
            source
                .into_records()
                .try_map_partitions_with_index(move |partition, records| {
                    let mut routed: Vec<(usize, SortKey, T)> = Vec::with_capacity(records.len());
                    for record in records {
                        let regions = region_fn(&record);
                        let Some(key) = regions
                            .iter()
                            .map(|r| table.ordering().key_or_fallback(r))
                            .min()
                        else {
                            stringency.check(PartitionError::UnmappedRecord { partition })?;
                            continue;
                        };
                        let mut destinations: Vec<usize> = regions
                            .iter()
                            .flat_map(|r| table.route(r, flank_size))
                            .collect();
                        destinations.sort_unstable();
                        destinations.dedup();
                        for destination in destinations {
                            routed.push((destination, key.clone(), record.clone()));
                        }
                    }
                    Ok::<_, PartitionError>(routed)
                })?
        };
        let routed_count = routed.count();

        let records = routed
            .repartition_and_sort_within_partitions(num_partitions, |(destination, key, _)| {
                (*destination, key.clone())
            })?
            .map_partitions(|p| p.into_iter().map(|(_, _, record)| record).collect());

        debug!(
            "Co-partitioning replicated {} records into {} copies",
            input_count, routed_count
        );
        info!("Co-partitioned {} records onto {} partitions", input_count, num_partitions);

        Ok(GenomicDataset::with_region_fn(records, sequences, region_fn)
            .with_partition_map(PartitionMap::Known(bounds.clone()))?
            .with_replication(Replication::new(table, flank_size)))
    }
}
