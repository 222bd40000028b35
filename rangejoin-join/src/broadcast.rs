//! Broadcast region join.
//!
//! The left side is collected into a [`ContigIndex`] over its flanked
//! regions and shared with every partition of the right side, which is
//! probed in place. Right partitioning is preserved; the left side is never
//! shuffled.

use std::sync::Arc;

use log::info;
use rangejoin_core::models::{ReferenceRegion, SequenceDictionary};
use rangejoin_overlaprs::{ContigIndex, OverlapperType};
use rangejoin_partition::copartition::flank_delta;
use rangejoin_partition::{Broadcast, GenomicDataset, RegionFn, broadcast};

use crate::config::JoinConfig;
use crate::errors::{JoinError, JoinResult};
use crate::output::{self, JoinOutput, JoinRow, JoinType};

///
/// A left dataset indexed for broadcast joins.
///
/// Build it once and join it against any number of right datasets. Rows
/// always put the indexed records on the left.
///
pub struct BroadcastIndex<L> {
    index: Broadcast<ContigIndex<L>>,
    region_fn: RegionFn<L>,
    sequences: SequenceDictionary,
    flank_size: u64,
}

impl<L> BroadcastIndex<L>
where
    L: Clone + Send + Sync + 'static,
{
    pub fn build(left: &GenomicDataset<L>, flank_size: u64, overlapper_type: OverlapperType) -> Self {
        let delta = flank_delta(flank_size);
        let entries: Vec<(ReferenceRegion, L)> = left
            .flatten_by_regions()
            .collect()
            .into_iter()
            .map(|(region, record)| (region.pad(delta), record))
            .collect();
        info!(
            "Broadcasting {} left intervals ({:?}, flank {})",
            entries.len(),
            overlapper_type,
            flank_size
        );

        BroadcastIndex {
            index: broadcast(ContigIndex::build(entries, overlapper_type)),
            region_fn: Arc::clone(left.region_fn()),
            sequences: left.sequences().clone(),
            flank_size,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn flank_size(&self) -> u64 {
        self.flank_size
    }

    /// Indexed records within `flank_size` of `region`.
    pub fn probe(&self, region: &ReferenceRegion) -> Vec<&L> {
        self.index.find_iter(region).map(|(_, record)| record).collect()
    }

    ///
    /// Probe every region of every right record.
    ///
    /// Only [`JoinType::Inner`] and [`JoinType::RightOuter`] are supported.
    /// With `group`, all matches of a right record form one
    /// [`JoinRow::RightGroup`].
    ///
    pub fn join_rows<R>(
        &self,
        right: GenomicDataset<R>,
        join_type: JoinType,
        group: bool,
    ) -> JoinResult<GenomicDataset<JoinRow<L, R>>>
    where
        R: Clone + Send + Sync + 'static,
    {
        Ok(self.join_output(right, join_type, group)?.into_dataset())
    }

    pub(crate) fn join_output<R>(
        &self,
        right: GenomicDataset<R>,
        join_type: JoinType,
        group: bool,
    ) -> JoinResult<JoinOutput<L, R>>
    where
        R: Clone + Send + Sync + 'static,
    {
        let keep_unmatched = match join_type {
            JoinType::Inner => false,
            JoinType::RightOuter => true,
            other => return Err(JoinError::UnsupportedBroadcastJoin(other)),
        };
        let right = right.dereplicate();
        let sequences = self.sequences.merge(right.sequences())?;
        let right_fn = Arc::clone(right.region_fn());
        let right_count = right.count();

        let rows = {
            let index = self.index.clone();
            let right_fn = Arc::clone(&right_fn);
            right.into_records().map_partitions(move |records| {
                let mut rows = Vec::new();
                for record in records {
                    let matches: Vec<&L> = right_fn(&record)
                        .iter()
                        .flat_map(|r| index.find_iter(r).map(|(_, l)| l).collect::<Vec<_>>())
                        .collect();
                    if group {
                        if !matches.is_empty() || keep_unmatched {
                            rows.push(JoinRow::RightGroup(
                                matches.into_iter().cloned().collect(),
                                record,
                            ));
                        }
                    } else if matches.is_empty() {
                        if keep_unmatched {
                            rows.push(JoinRow::RightOnly(record));
                        }
                    } else {
                        for l in matches {
                            rows.push(JoinRow::Pair(l.clone(), record.clone()));
                        }
                    }
                }
                rows
            })
        };
        info!(
            "Broadcast join of {} right records produced {} rows",
            right_count,
            rows.count()
        );

        Ok(JoinOutput {
            rows,
            sequences,
            left_fn: Arc::clone(&self.region_fn),
            right_fn,
        })
    }

    pub fn join_against<R>(&self, right: GenomicDataset<R>) -> JoinResult<GenomicDataset<(L, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        Ok(self
            .join_output(right, JoinType::Inner, false)?
            .into_typed(|row| match row {
                JoinRow::Pair(l, r) => Some((l, r)),
                _ => None,
            }, output::view_pair))
    }

    pub fn right_outer_join_against<R>(
        &self,
        right: GenomicDataset<R>,
    ) -> JoinResult<GenomicDataset<(Option<L>, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        Ok(self
            .join_output(right, JoinType::RightOuter, false)?
            .into_typed(|row| match row {
                JoinRow::Pair(l, r) => Some((Some(l), r)),
                JoinRow::RightOnly(r) => Some((None, r)),
                _ => None,
            }, output::view_optional_left))
    }

    pub fn join_against_and_group_by_right<R>(
        &self,
        right: GenomicDataset<R>,
    ) -> JoinResult<GenomicDataset<(Vec<L>, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        Ok(self
            .join_output(right, JoinType::Inner, true)?
            .into_typed(right_group, output::view_right_group))
    }

    pub fn right_outer_join_against_and_group_by_right<R>(
        &self,
        right: GenomicDataset<R>,
    ) -> JoinResult<GenomicDataset<(Vec<L>, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        Ok(self
            .join_output(right, JoinType::RightOuter, true)?
            .into_typed(right_group, output::view_right_group))
    }
}

fn right_group<L, R>(row: JoinRow<L, R>) -> Option<(Vec<L>, R)> {
    match row {
        JoinRow::RightGroup(ls, r) => Some((ls, r)),
        _ => None,
    }
}

/// General broadcast join returning [`JoinRow`]s.
pub fn broadcast_join<L, R>(
    left: &GenomicDataset<L>,
    right: GenomicDataset<R>,
    config: &JoinConfig,
    join_type: JoinType,
    group: bool,
) -> JoinResult<GenomicDataset<JoinRow<L, R>>>
where
    L: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    config.install(|| {
        left.broadcast(config).join_rows(right, join_type, group)
    })?
}

/// Broadcast joins with `self` as the indexed left side.
pub trait BroadcastRegionJoin<L> {
    /// Index this dataset for repeated joins.
    fn broadcast(&self, config: &JoinConfig) -> BroadcastIndex<L>;

    fn broadcast_region_join<R>(
        &self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(L, R)>>
    where
        R: Clone + Send + Sync + 'static;

    fn right_outer_broadcast_region_join<R>(
        &self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Option<L>, R)>>
    where
        R: Clone + Send + Sync + 'static;

    fn broadcast_region_join_and_group_by_right<R>(
        &self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Vec<L>, R)>>
    where
        R: Clone + Send + Sync + 'static;

    fn right_outer_broadcast_region_join_and_group_by_right<R>(
        &self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Vec<L>, R)>>
    where
        R: Clone + Send + Sync + 'static;
}

impl<L> BroadcastRegionJoin<L> for GenomicDataset<L>
where
    L: Clone + Send + Sync + 'static,
{
    fn broadcast(&self, config: &JoinConfig) -> BroadcastIndex<L> {
        BroadcastIndex::build(self, config.flank_size, config.overlapper)
    }

    fn broadcast_region_join<R>(
        &self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(L, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        config.install(|| self.broadcast(config).join_against(right))?
    }

    fn right_outer_broadcast_region_join<R>(
        &self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Option<L>, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        config.install(|| self.broadcast(config).right_outer_join_against(right))?
    }

    fn broadcast_region_join_and_group_by_right<R>(
        &self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Vec<L>, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        config.install(|| self.broadcast(config).join_against_and_group_by_right(right))?
    }

    fn right_outer_broadcast_region_join_and_group_by_right<R>(
        &self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Vec<L>, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        config.install(|| {
            self.broadcast(config)
                .right_outer_join_against_and_group_by_right(right)
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    type Named = (ReferenceRegion, &'static str);

    fn named(items: &[(&str, &'static str)], partitions: usize) -> GenomicDataset<Named> {
        let sequences =
            SequenceDictionary::from_lengths(vec![("chr1", 10_000), ("chr2", 10_000)]).unwrap();
        GenomicDataset::from_vec(
            items
                .iter()
                .map(|(r, n)| (r.parse::<ReferenceRegion>().unwrap(), *n))
                .collect(),
            partitions,
            sequences,
            |(r, _): &Named| vec![r.clone()],
        )
    }

    #[fixture]
    fn genes() -> GenomicDataset<Named> {
        named(&[("chr1:100-200", "g1"), ("chr1:150-400", "g2"), ("chr2:0-50", "g3")], 2)
    }

    #[fixture]
    fn reads() -> GenomicDataset<Named> {
        named(
            &[("chr1:180-190", "r1"), ("chr1:390-420", "r2"), ("chr1:900-950", "r3"), ("chr2:60-70", "r4")],
            3,
        )
    }

    fn names<A: Ord + Clone, B: Ord + Clone>(mut rows: Vec<(A, B)>) -> Vec<(A, B)> {
        rows.sort();
        rows
    }

    #[rstest]
    #[case(OverlapperType::AIList)]
    #[case(OverlapperType::IntervalArray)]
    fn test_inner(genes: GenomicDataset<Named>, reads: GenomicDataset<Named>, #[case] overlapper: OverlapperType) {
        let config = JoinConfig::default().with_overlapper(overlapper);
        let joined = genes.broadcast_region_join(reads, &config).unwrap();
        assert_eq!(joined.num_partitions(), 3);
        let rows: Vec<(&str, &str)> = joined.into_records().collect().into_iter().map(|(l, r)| (l.1, r.1)).collect();
        assert_eq!(names(rows), vec![("g1", "r1"), ("g2", "r1"), ("g2", "r2")]);
    }

    #[rstest]
    fn test_right_outer_with_flank(genes: GenomicDataset<Named>, reads: GenomicDataset<Named>) {
        let config = JoinConfig::default().with_flank_size(15);
        let joined = genes.right_outer_broadcast_region_join(reads, &config).unwrap();
        let rows: Vec<(Option<&str>, &str)> = joined
            .into_records()
            .collect()
            .into_iter()
            .map(|(l, r)| (l.map(|l| l.1), r.1))
            .collect();
        assert_eq!(
            names(rows),
            vec![(None, "r3"), (Some("g1"), "r1"), (Some("g2"), "r1"), (Some("g2"), "r2"), (Some("g3"), "r4")]
        );
    }

    #[rstest]
    fn test_reported_regions_are_unpadded(genes: GenomicDataset<Named>, reads: GenomicDataset<Named>) {
        let config = JoinConfig::default().with_flank_size(15);
        let joined = genes.broadcast_region_join(reads, &config).unwrap();
        let g3 = joined
            .records()
            .iter()
            .find(|(l, _)| l.1 == "g3")
            .cloned()
            .unwrap();
        assert_eq!(
            joined.regions_of(&g3),
            vec!["chr2:0-50".parse().unwrap(), "chr2:60-70".parse().unwrap()]
        );
    }

    #[rstest]
    fn test_grouped(genes: GenomicDataset<Named>, reads: GenomicDataset<Named>) {
        let index = genes.broadcast(&JoinConfig::default());
        assert_eq!(index.len(), 3);

        let grouped = index.join_against_and_group_by_right(reads.clone()).unwrap();
        let mut rows: Vec<(Vec<&str>, &str)> = grouped
            .into_records()
            .collect()
            .into_iter()
            .map(|(ls, r)| {
                let mut ls: Vec<&str> = ls.iter().map(|l| l.1).collect();
                ls.sort();
                (ls, r.1)
            })
            .collect();
        rows.sort();
        assert_eq!(rows, vec![(vec!["g1", "g2"], "r1"), (vec!["g2"], "r2")]);

        let outer = index.right_outer_join_against_and_group_by_right(reads).unwrap();
        assert_eq!(outer.count(), 4);
        assert_eq!(
            outer.records().iter().filter(|(ls, _)| ls.is_empty()).count(),
            2
        );
    }

    #[rstest]
    fn test_unsupported_join_type(genes: GenomicDataset<Named>, reads: GenomicDataset<Named>) {
        let result = broadcast_join(&genes, reads, &JoinConfig::default(), JoinType::FullOuter, false);
        assert!(matches!(
            result,
            Err(JoinError::UnsupportedBroadcastJoin(JoinType::FullOuter))
        ));
    }
}
