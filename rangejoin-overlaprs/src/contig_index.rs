//! Genome-wide overlap index: one [`Overlapper`] per contig.
//!
//! [`ContigIndex`] is the structure the broadcast join replicates to every
//! worker. It owns the indexed payloads and answers "which entries overlap
//! this region" without knowing anything about partitions.
//!
//! ```
//! use rangejoin_core::models::ReferenceRegion;
//! use rangejoin_overlaprs::{OverlapperType, contig_index::IntoContigIndex};
//!
//! let genes = vec![
//!     (ReferenceRegion::new("chr1", 1000, 2000).unwrap(), "BRCA1"),
//!     (ReferenceRegion::new("chr1", 5000, 6000).unwrap(), "TP53"),
//!     (ReferenceRegion::new("chr2", 1000, 3000).unwrap(), "EGFR"),
//! ];
//! let index = genes.into_contig_index(OverlapperType::AIList);
//!
//! let query = ReferenceRegion::new("chr1", 1500, 5500).unwrap();
//! let mut hits: Vec<&str> = index.find_iter(&query).map(|(_, gene)| *gene).collect();
//! hits.sort();
//! assert_eq!(hits, vec!["BRCA1", "TP53"]);
//! ```

use fxhash::FxHashMap;

use rangejoin_core::models::{Interval, ReferenceRegion};

use crate::{AIList, IntervalArray, Overlapper, OverlapperType};

/// Per-contig overlap index over `(ReferenceRegion, T)` entries.
pub struct ContigIndex<T> {
    index_maps: FxHashMap<String, Box<dyn Overlapper<u64, usize>>>,
    regions: Vec<ReferenceRegion>,
    values: Vec<T>,
    overlapper_type: OverlapperType,
}

impl<T> ContigIndex<T>
where
    T: Send + Sync,
{
    pub fn build(entries: Vec<(ReferenceRegion, T)>, overlapper_type: OverlapperType) -> Self {
        let mut intervals: FxHashMap<String, Vec<Interval<u64, usize>>> = FxHashMap::default();
        let mut regions = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());

        // STEP 1: bucket entries by contig, remembering their slot
        for (slot, (region, value)) in entries.into_iter().enumerate() {
            intervals
                .entry(region.reference_name.clone())
                .or_default()
                .push(Interval {
                    start: region.start,
                    end: region.end,
                    val: slot,
                });
            regions.push(region);
            values.push(value);
        }

        // STEP 2: build one overlapper per contig
        let index_maps = intervals
            .into_iter()
            .map(|(chr, chr_intervals)| {
                let lapper: Box<dyn Overlapper<u64, usize>> = match overlapper_type {
                    OverlapperType::AIList => Box::new(AIList::build(chr_intervals)),
                    OverlapperType::IntervalArray => Box::new(IntervalArray::build(chr_intervals)),
                };
                (chr, lapper)
            })
            .collect();

        ContigIndex {
            index_maps,
            regions,
            values,
            overlapper_type,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn overlapper_type(&self) -> OverlapperType {
        self.overlapper_type
    }

    pub fn contigs(&self) -> impl Iterator<Item = &str> {
        self.index_maps.keys().map(|k| k.as_str())
    }

    /// Slots of the entries overlapping `region`.
    pub fn find_slots<'a>(
        &'a self,
        region: &ReferenceRegion,
    ) -> Box<dyn Iterator<Item = usize> + 'a> {
        match self.index_maps.get(&region.reference_name) {
            Some(lapper) => Box::new(lapper.find_iter(region.start, region.end).map(|iv| iv.val)),
            None => Box::new(std::iter::empty()),
        }
    }

    /// Entries overlapping `region`, with their indexed region.
    pub fn find_iter<'a>(
        &'a self,
        region: &ReferenceRegion,
    ) -> Box<dyn Iterator<Item = (&'a ReferenceRegion, &'a T)> + 'a> {
        Box::new(
            self.find_slots(region)
                .map(move |slot| (&self.regions[slot], &self.values[slot])),
        )
    }

    pub fn count_overlaps(&self, region: &ReferenceRegion) -> usize {
        self.find_slots(region).count()
    }

    pub fn region(&self, slot: usize) -> Option<&ReferenceRegion> {
        self.regions.get(slot)
    }

    pub fn value(&self, slot: usize) -> Option<&T> {
        self.values.get(slot)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ReferenceRegion, &T)> {
        self.regions.iter().zip(self.values.iter())
    }
}

/// Conversion into a [`ContigIndex`], mirroring how region collections are
/// turned into indexes elsewhere in the workspace.
pub trait IntoContigIndex<T> {
    fn into_contig_index(self, overlapper_type: OverlapperType) -> ContigIndex<T>;
}

impl<T> IntoContigIndex<T> for Vec<(ReferenceRegion, T)>
where
    T: Send + Sync,
{
    fn into_contig_index(self, overlapper_type: OverlapperType) -> ContigIndex<T> {
        ContigIndex::build(self, overlapper_type)
    }
}
