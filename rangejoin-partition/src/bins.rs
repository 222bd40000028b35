//! Fixed-width genome bins and flanked per-bin processing.

use std::sync::Arc;

use fxhash::FxHashMap;
use log::{info, warn};
use rangejoin_core::models::{ReferenceRegion, SequenceDictionary};

use crate::copartition::flank_delta;
use crate::dataset::{GenomicDataset, RegionFn};
use crate::errors::PartitionError;
use crate::ordering::RegionOrdering;
use crate::partitioned::{Partitioned, broadcast};

///
/// Tiles every contig of a dictionary into bins of `bin_size` bases.
///
/// Contigs are laid out one after another (by rank when the dictionary is
/// fully ranked, by name otherwise), so bin indices are global. The last bin
/// of a contig may be shorter than `bin_size`; every contig has at least one
/// bin.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeBins {
    bin_size: u64,
    names: Vec<String>,
    lengths: Vec<u64>,
    /// first bin of each contig, plus the total as a final entry
    offsets: Vec<usize>,
    by_name: FxHashMap<String, usize>,
}

impl GenomeBins {
    pub fn new(bin_size: u64, sequences: &SequenceDictionary) -> Result<Self, PartitionError> {
        if bin_size == 0 {
            return Err(PartitionError::InvalidBinSize);
        }
        let names = sequences.ordered_names();
        let lengths: Vec<u64> = names
            .iter()
            .map(|n| sequences.length_of(n).unwrap_or(0))
            .collect();

        let mut offsets = Vec::with_capacity(names.len() + 1);
        let mut total = 0usize;
        for length in &lengths {
            offsets.push(total);
            total += length.div_ceil(bin_size).max(1) as usize;
        }
        offsets.push(total);

        let by_name = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();

        Ok(GenomeBins {
            bin_size,
            names,
            lengths,
            offsets,
            by_name,
        })
    }

    /// Bins sized so the genome splits into roughly `num_bins` bins.
    pub fn with_target_bins(
        num_bins: usize,
        sequences: &SequenceDictionary,
    ) -> Result<Self, PartitionError> {
        if num_bins == 0 {
            return Err(PartitionError::ZeroPartitions);
        }
        let genome: u64 = sequences.iter().map(|r| r.length).sum();
        Self::new(genome.div_ceil(num_bins as u64).max(1), sequences)
    }

    pub fn bin_size(&self) -> u64 {
        self.bin_size
    }

    pub fn num_bins(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    fn contig_bins(&self, contig: usize) -> usize {
        self.offsets[contig + 1] - self.offsets[contig]
    }

    fn bin_of(&self, contig: usize, position: u64) -> usize {
        let relative = (position / self.bin_size).min(self.contig_bins(contig) as u64 - 1);
        self.offsets[contig] + relative as usize
    }

    /// Bin holding the first base of `region`; `None` for an unknown contig.
    pub fn get_start_bin(&self, region: &ReferenceRegion) -> Option<usize> {
        let contig = *self.by_name.get(&region.reference_name)?;
        Some(self.bin_of(contig, region.start))
    }

    /// Bin holding the last base of `region`, clamped to the contig's last bin.
    pub fn get_end_bin(&self, region: &ReferenceRegion) -> Option<usize> {
        let contig = *self.by_name.get(&region.reference_name)?;
        let last = if region.end > region.start {
            region.end - 1
        } else {
            region.start
        };
        Some(self.bin_of(contig, last))
    }

    /// The span of bin `index`; `None` past the last bin.
    pub fn invert(&self, index: usize) -> Option<ReferenceRegion> {
        if index >= self.num_bins() {
            return None;
        }
        let contig = self.offsets.partition_point(|&o| o <= index) - 1;
        let relative = (index - self.offsets[contig]) as u64;
        let start = relative * self.bin_size;
        let end = (start + self.bin_size).min(self.lengths[contig]).max(start);
        Some(ReferenceRegion {
            reference_name: self.names[contig].clone(),
            start,
            end,
        })
    }
}

impl<T> GenomicDataset<T>
where
    T: Clone + Send + Sync,
{
    ///
    /// Copy each record into every bin its regions, padded by `flank`, touch.
    ///
    /// Returns one partition per bin, each sorted by region. Records on
    /// contigs outside `bins` are dropped with a warning.
    ///
    pub fn bin_by_flanked_regions(
        &self,
        bins: &GenomeBins,
        flank: u64,
    ) -> Result<Partitioned<T>, PartitionError> {
        let ordering = RegionOrdering::for_dictionary(self.sequences());
        let region_fn = Arc::clone(self.region_fn());
        let shared = broadcast(bins.clone());

        let routed = self.primary_records().map_partitions(|records| {
            let mut routed = Vec::new();
            for record in records {
                let regions = region_fn(&record);
                let Some(key) = regions.iter().map(|r| ordering.key_or_fallback(r)).min() else {
                    continue;
                };
                let mut touched: Vec<usize> = Vec::new();
                for region in &regions {
                    let padded = region.pad(flank_delta(flank));
                    match (shared.get_start_bin(&padded), shared.get_end_bin(&padded)) {
                        (Some(first), Some(last)) => touched.extend(first..=last),
                        _ => warn!("Skipping region {region}: contig is not binned"),
                    }
                }
                touched.sort_unstable();
                touched.dedup();
                for bin in touched {
                    routed.push((bin, key.clone(), record.clone()));
                }
            }
            routed
        });

        Ok(routed
            .repartition_and_sort_within_partitions(bins.num_bins().max(1), |(bin, key, _)| {
                (*bin, key.clone())
            })?
            .map_partitions(|p| p.into_iter().map(|(_, _, record)| record).collect()))
    }

    ///
    /// Run `f` over every bin with the records whose flanked regions reach
    /// into it, keeping each output only in bins its regions overlap.
    ///
    /// `f` receives the bin's span and its records. An output whose regions
    /// overlap several bins is emitted once per bin.
    ///
    pub fn flanked_map_partitions<U, F>(
        &self,
        bins: &GenomeBins,
        flank: u64,
        f: F,
        out_region_fn: RegionFn<U>,
    ) -> Result<GenomicDataset<U>, PartitionError>
    where
        U: Send + Sync,
        F: Fn(&ReferenceRegion, Vec<T>) -> Vec<U> + Send + Sync,
    {
        let binned = self.bin_by_flanked_regions(bins, flank)?;
        let shared = broadcast(bins.clone());
        let region_fn = Arc::clone(&out_region_fn);

        let outputs = binned.map_partitions_with_index(|index, records| {
            let Some(span) = shared.invert(index) else {
                return Vec::new();
            };
            f(&span, records)
                .into_iter()
                .filter(|out| region_fn(out).iter().any(|r| span_contains(&span, r)))
                .collect()
        });
        info!(
            "Flanked processing over {} bins of {} bases produced {} records",
            bins.num_bins(),
            bins.bin_size(),
            outputs.count()
        );

        Ok(GenomicDataset::with_region_fn(
            outputs,
            self.sequences().clone(),
            out_region_fn,
        ))
    }
}

/// Overlap with a bin, counting a zero-width region at a bin's start as inside it.
fn span_contains(span: &ReferenceRegion, region: &ReferenceRegion) -> bool {
    if region.start == region.end {
        span.same_contig(region) && span.start <= region.start && region.start < span.end
    } else {
        span.overlaps(region)
    }
}
