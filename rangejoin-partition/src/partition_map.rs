use std::cmp::Ordering;

use rangejoin_core::models::ReferenceRegion;

use crate::errors::PartitionError;
use crate::ordering::{RegionOrdering, SortStrategy};
use crate::partitioned::Partitioned;

/// Lowest-starting and highest-ending region observed in one partition.
pub type PartitionBound = (ReferenceRegion, ReferenceRegion);

///
/// Per-partition bounds of a sorted dataset.
///
/// Slot `i` is `None` when partition `i` is empty. Under the ordering the
/// dataset was sorted with, non-empty slots are non-decreasing: each
/// partition's high bound starts no later than the next partition's low
/// bound.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionBounds {
    slots: Vec<Option<PartitionBound>>,
    strategy: SortStrategy,
}

impl PartitionBounds {
    pub fn new(slots: Vec<Option<PartitionBound>>, strategy: SortStrategy) -> Self {
        PartitionBounds { slots, strategy }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PartitionBound> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }

    pub fn slots(&self) -> &[Option<PartitionBound>] {
        &self.slots
    }

    /// Non-empty slots with their partition index.
    pub fn non_empty(&self) -> impl Iterator<Item = (usize, &PartitionBound)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|b| (i, b)))
    }

    /// The ordering the dataset was sorted with.
    pub fn strategy(&self) -> SortStrategy {
        self.strategy
    }
}

///
/// What is known about how a dataset is laid out across partitions.
///
/// A dataset is *sorted* exactly when its map is [`Known`](PartitionMap::Known).
///
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PartitionMap {
    #[default]
    Unknown,
    Known(PartitionBounds),
}

impl PartitionMap {
    pub fn is_sorted(&self) -> bool {
        matches!(self, PartitionMap::Known(_))
    }

    pub fn bounds(&self) -> Option<&PartitionBounds> {
        match self {
            PartitionMap::Known(bounds) => Some(bounds),
            PartitionMap::Unknown => None,
        }
    }

    /// A known map must have exactly one slot per partition.
    pub fn validate(&self, num_partitions: usize) -> Result<(), PartitionError> {
        match self {
            PartitionMap::Known(bounds) if bounds.len() != num_partitions => {
                Err(PartitionError::PartitionMapLengthMismatch {
                    slots: bounds.len(),
                    partitions: num_partitions,
                })
            }
            _ => Ok(()),
        }
    }

    ///
    /// Summarize each partition of `records` into its bounds.
    ///
    /// The low bound is the region with the smallest (contig, start); the
    /// high bound is the region with the largest (contig, end). Records with
    /// several regions contribute all of them.
    ///
    pub fn compute<T, F>(records: &Partitioned<T>, region_fn: F, ordering: &RegionOrdering) -> Self
    where
        T: Sync,
        F: Fn(&T) -> Vec<ReferenceRegion> + Send + Sync,
    {
        let slots = records.collect_partition_summaries(|_, partition| {
            summarize(partition.iter().flat_map(&region_fn), ordering)
        });
        PartitionMap::Known(PartitionBounds::new(slots, ordering.strategy()))
    }

    ///
    /// Partitions whose bounds could hold a record overlapping `query`.
    ///
    /// `None` when the map is unknown. A partition whose bounds span several
    /// contigs is kept whenever `query` lies on a contig between them.
    ///
    pub fn candidate_partitions(
        &self,
        query: &ReferenceRegion,
        ordering: &RegionOrdering,
    ) -> Option<Vec<usize>> {
        let bounds = self.bounds()?;
        Some(
            bounds
                .non_empty()
                .filter(|(_, (lo, hi))| may_overlap(lo, hi, query, ordering))
                .map(|(i, _)| i)
                .collect(),
        )
    }
}

fn summarize(
    regions: impl Iterator<Item = ReferenceRegion>,
    ordering: &RegionOrdering,
) -> Option<PartitionBound> {
    let mut bound: Option<PartitionBound> = None;
    for region in regions {
        bound = Some(match bound {
            None => (region.clone(), region),
            Some((lo, hi)) => {
                let lo = if ordering.compare(&region, &lo) == Ordering::Less {
                    region.clone()
                } else {
                    lo
                };
                let hi = if ordering.compare_ends(&region, &hi) == Ordering::Greater {
                    region
                } else {
                    hi
                };
                (lo, hi)
            }
        });
    }
    bound
}

fn may_overlap(
    lo: &ReferenceRegion,
    hi: &ReferenceRegion,
    query: &ReferenceRegion,
    ordering: &RegionOrdering,
) -> bool {
    let first = ordering.contig_key_or_name(&lo.reference_name);
    let last = ordering.contig_key_or_name(&hi.reference_name);
    let contig = ordering.contig_key_or_name(&query.reference_name);

    if first == last {
        return contig == first && lo.start < query.end && query.start < hi.end;
    }
    if contig == first {
        lo.start < query.end
    } else if contig == last {
        query.start < hi.end
    } else {
        first < contig && contig < last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rangejoin_core::models::SequenceDictionary;
    use rstest::*;

    fn region(s: &str) -> ReferenceRegion {
        s.parse().unwrap()
    }

    #[fixture]
    fn ordering() -> RegionOrdering {
        let sequences =
            SequenceDictionary::from_lengths(vec![("chr1", 1000), ("chr2", 1000), ("chr3", 1000)])
                .unwrap();
        RegionOrdering::ranked(&sequences).unwrap()
    }

    #[rstest]
    fn test_compute_bounds(ordering: RegionOrdering) {
        let records = Partitioned::new(vec![
            vec![region("chr1:10-500"), region("chr1:20-30"), region("chr1:40-50")],
            vec![],
            vec![region("chr1:600-700"), region("chr2:0-10")],
        ]);
        let map = PartitionMap::compute(&records, |r: &ReferenceRegion| vec![r.clone()], &ordering);
        let bounds = map.bounds().unwrap();

        assert_eq!(bounds.len(), 3);
        assert_eq!(
            bounds.get(0),
            Some(&(region("chr1:10-500"), region("chr1:10-500")))
        );
        assert_eq!(bounds.get(1), None);
        assert_eq!(
            bounds.get(2),
            Some(&(region("chr1:600-700"), region("chr2:0-10")))
        );
        assert!(map.is_sorted());
    }

    #[test]
    fn test_validate() {
        let map = PartitionMap::Known(PartitionBounds::new(vec![None, None], SortStrategy::Ranked));
        assert_eq!(map.validate(2), Ok(()));
        assert_eq!(
            map.validate(3),
            Err(PartitionError::PartitionMapLengthMismatch {
                slots: 2,
                partitions: 3
            })
        );
        assert_eq!(PartitionMap::Unknown.validate(7), Ok(()));
    }

    #[rstest]
    #[case("chr1:0-50", vec![0])]
    #[case("chr1:150-160", vec![1])]
    #[case("chr2:500-600", vec![1, 2])]
    #[case("chr3:0-10", vec![2])]
    #[case("chr3:900-950", vec![])]
    #[case("chrX:0-10", vec![])]
    fn test_candidate_partitions(
        ordering: RegionOrdering,
        #[case] query: &str,
        #[case] expected: Vec<usize>,
    ) {
        let map = PartitionMap::Known(PartitionBounds::new(
            vec![
                Some((region("chr1:0-10"), region("chr1:90-100"))),
                Some((region("chr1:100-110"), region("chr2:500-550"))),
                Some((region("chr2:520-530"), region("chr3:0-100"))),
            ],
            SortStrategy::Ranked,
        ));
        assert_eq!(map.candidate_partitions(&region(query), &ordering), Some(expected));
    }
}
