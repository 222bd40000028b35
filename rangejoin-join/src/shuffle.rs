//! Shuffle (sort-merge) region join.
//!
//! Both sides are brought onto one range partitioning: the side that is
//! already sorted becomes the anchor (sorting the left side when neither
//! is), and the other side is routed onto the anchor's partition bounds.
//! Each pair of co-located partitions is then merged in a single pass.
//!
//! Co-partitioned inputs are dereplicated first, so every record enters
//! the join once and the anchor side holds each of its entries in exactly
//! one partition. Routing the other side can still copy a record into
//! several partitions. Pairs are reported once, by the anchor entry's
//! partition, but unmatched and grouped output is reconciled by record id
//! across partitions.

use std::sync::Arc;

use log::{debug, info};
use rangejoin_core::models::{ReferenceRegion, ValidationStringency};
use rangejoin_partition::copartition::flank_delta;
use rangejoin_partition::{
    Broadcast, BoundaryTable, GenomicDataset, PartitionError, Partitioned, RegionFn, SortOptions,
    broadcast,
};

use crate::config::JoinConfig;
use crate::errors::{JoinError, JoinResult};
use crate::merge::{Entry, check_sorted, sweep};
use crate::output::{self, GroupBy, JoinOutput, JoinRow, JoinType};
use crate::reconcile::{Partial, reconcile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Left,
    Right,
}

/// Everything one co-located partition pair produced.
struct PartitionOutput<L, R> {
    pairs: Vec<JoinRow<L, R>>,
    left: Vec<Partial<L, R>>,
    right: Vec<Partial<R, L>>,
}

///
/// General shuffle join returning [`JoinRow`]s.
///
/// Ungrouped joins produce [`JoinRow::Pair`] per match plus one-sided rows
/// for unmatched records the join type keeps. Grouping by a side produces
/// one group row per record of that side instead of pairs.
///
pub fn shuffle_join<L, R>(
    left: GenomicDataset<L>,
    right: GenomicDataset<R>,
    config: &JoinConfig,
    join_type: JoinType,
    group_by: GroupBy,
) -> JoinResult<GenomicDataset<JoinRow<L, R>>>
where
    L: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    config.install(|| {
        Ok(shuffle_output(left, right, config, join_type, group_by)?.into_dataset())
    })?
}

pub(crate) fn shuffle_output<L, R>(
    left: GenomicDataset<L>,
    right: GenomicDataset<R>,
    config: &JoinConfig,
    join_type: JoinType,
    group_by: GroupBy,
) -> JoinResult<JoinOutput<L, R>>
where
    L: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    info!(
        "Shuffle {:?} join of {} left and {} right records (group by {:?}, flank {})",
        join_type,
        left.count(),
        right.count(),
        group_by,
        config.flank_size
    );
    let (left, right) = (left.dereplicate(), right.dereplicate());
    let sequences = left.sequences().merge(right.sequences())?;
    let left_fn = Arc::clone(left.region_fn());
    let right_fn = Arc::clone(right.region_fn());
    let flank = config.flank_size;
    let stringency = config.stringency;

    // STEP 1: pick the anchor, sorting the left side if nothing is sorted
    let (left, anchor) = match (left.is_sorted(), right.is_sorted()) {
        (false, false) => {
            let options = SortOptions {
                partitions: config.partitions.or(Some(left.num_partitions())),
                strategy: config.sort_strategy,
                stringency,
                record_bounds: true,
            };
            (left.sort_with(&options)?, Anchor::Left)
        }
        (false, true) => (left, Anchor::Right),
        _ => (left, Anchor::Left),
    };
    let table = match anchor {
        Anchor::Left => boundary_table(&left)?,
        Anchor::Right => boundary_table(&right)?,
    };
    let num_partitions = table.num_partitions().max(1);
    debug!("Anchoring on the {:?} side with {} partitions", anchor, num_partitions);

    // STEP 2: one entry per region, on the anchor's partitioning
    let left_records = number_records(left.into_records());
    let right_records = number_records(right.into_records());
    let (left_entries, right_entries) = match anchor {
        Anchor::Left => (
            anchor_entries(left_records, &left_fn, &table, flank_delta(flank), stringency)?,
            routed_entries(right_records, &right_fn, &table, flank, 0, stringency)?,
        ),
        Anchor::Right => (
            routed_entries(left_records, &left_fn, &table, flank, flank_delta(flank), stringency)?,
            anchor_entries(right_records, &right_fn, &table, 0, stringency)?,
        ),
    };

    // STEP 3: merge co-located partitions
    let outputs = left_entries
        .zip_partitions(right_entries, |partition, left, right| {
            vec![merge_partition(partition, left, right, join_type, group_by)]
        })?
        .collect()
        .into_iter()
        .collect::<JoinResult<Vec<_>>>()?;

    let mut pairs = Vec::with_capacity(outputs.len());
    let mut left_partials = Vec::with_capacity(outputs.len());
    let mut right_partials = Vec::with_capacity(outputs.len());
    for output in outputs {
        pairs.push(output.pairs);
        left_partials.push(output.left);
        right_partials.push(output.right);
    }

    // STEP 4: reconcile record copies into one-sided and grouped rows
    let left_rows = finish_side(
        Partitioned::new(left_partials),
        num_partitions,
        group_by == GroupBy::Left,
        join_type.keeps_unmatched_left(),
        JoinRow::LeftGroup,
        JoinRow::LeftOnly,
    )?;
    let right_rows = finish_side(
        Partitioned::new(right_partials),
        num_partitions,
        group_by == GroupBy::Right,
        join_type.keeps_unmatched_right(),
        |r, ls| JoinRow::RightGroup(ls, r),
        JoinRow::RightOnly,
    )?;

    let rows = Partitioned::new(pairs)
        .zip_partitions(left_rows, concat)?
        .zip_partitions(right_rows, concat)?;
    info!("Shuffle join produced {} rows", rows.count());

    Ok(JoinOutput {
        rows,
        sequences,
        left_fn,
        right_fn,
    })
}

fn boundary_table<T>(anchor: &GenomicDataset<T>) -> JoinResult<Broadcast<BoundaryTable>>
where
    T: Send + Sync,
{
    let bounds = anchor
        .partition_map()
        .bounds()
        .ok_or(PartitionError::MissingPartitionMap)?;
    Ok(broadcast(BoundaryTable::from_partition_map(
        bounds,
        anchor.sequences(),
    )?))
}

/// Pair every record with its position in the whole collection.
fn number_records<T>(records: Partitioned<T>) -> Partitioned<(u64, T)>
where
    T: Send + Sync,
{
    let sizes = records.collect_partition_summaries(|_, partition| partition.len() as u64);
    let offsets: Vec<u64> = sizes
        .iter()
        .scan(0u64, |total, &size| {
            let offset = *total;
            *total += size;
            Some(offset)
        })
        .collect();
    records.map_partitions_with_index(move |partition, records| {
        let offset = offsets[partition];
        records
            .into_iter()
            .enumerate()
            .map(|(i, record)| (offset + i as u64, record))
            .collect()
    })
}

fn make_entry<T>(table: &BoundaryTable, region: &ReferenceRegion, pad: i64, id: u64, value: T) -> Entry<T> {
    let region = region.pad(pad);
    Entry {
        sort: table.ordering().key_or_fallback(&region),
        region,
        id,
        value,
    }
}

/// Entries of the anchor side, kept in place and sorted per partition.
fn anchor_entries<T>(
    records: Partitioned<(u64, T)>,
    region_fn: &RegionFn<T>,
    table: &Broadcast<BoundaryTable>,
    pad: i64,
    stringency: ValidationStringency,
) -> JoinResult<Partitioned<Entry<T>>>
where
    T: Clone + Send + Sync,
{
    Ok(records.try_map_partitions_with_index(|partition, records| {
        let mut entries = Vec::with_capacity(records.len());
        for (id, record) in records {
            let regions = region_fn(&record);
            if regions.is_empty() {
                stringency.check(PartitionError::UnmappedRecord { partition })?;
                continue;
            }
            for region in &regions {
                entries.push(make_entry(table, region, pad, id, record.clone()));
            }
        }
        entries.sort_by(|a, b| a.sort.cmp(&b.sort));
        Ok::<_, PartitionError>(entries)
    })?)
}

///
/// Entries of the other side, routed onto the anchor's partitions.
///
/// Each region goes to every partition its flanked span touches.
///
fn routed_entries<T>(
    records: Partitioned<(u64, T)>,
    region_fn: &RegionFn<T>,
    table: &Broadcast<BoundaryTable>,
    flank: u64,
    pad: i64,
    stringency: ValidationStringency,
) -> JoinResult<Partitioned<Entry<T>>>
where
    T: Clone + Send + Sync,
{
    let routed = records.try_map_partitions_with_index(|partition, records| {
        let mut routed = Vec::with_capacity(records.len());
        for (id, record) in records {
            let regions = region_fn(&record);
            if regions.is_empty() {
                stringency.check(PartitionError::UnmappedRecord { partition })?;
                continue;
            }
            for region in &regions {
                for destination in table.route(region, flank) {
                    routed.push((destination, make_entry(table, region, pad, id, record.clone())));
                }
            }
        }
        Ok::<_, PartitionError>(routed)
    })?;

    let num_partitions = table.num_partitions().max(1);
    Ok(routed
        .repartition_and_sort_within_partitions(num_partitions, |(destination, entry)| {
            (*destination, entry.sort.clone())
        })?
        .map_partitions(|routed| routed.into_iter().map(|(_, entry)| entry).collect()))
}

fn merge_partition<L, R>(
    partition: usize,
    left: Vec<Entry<L>>,
    right: Vec<Entry<R>>,
    join_type: JoinType,
    group_by: GroupBy,
) -> JoinResult<PartitionOutput<L, R>>
where
    L: Clone,
    R: Clone,
{
    check_sorted(&left, "left", partition)?;
    check_sorted(&right, "right", partition)?;
    let matches = sweep(&left, &right);

    let pairs = if group_by == GroupBy::None {
        matches
            .iter()
            .map(|&(li, ri)| JoinRow::Pair(left[li].value.clone(), right[ri].value.clone()))
            .collect()
    } else {
        Vec::new()
    };

    let left_partials = if group_by == GroupBy::Left || join_type.keeps_unmatched_left() {
        partials(&left, &right, matches.iter().copied(), group_by == GroupBy::Left)
    } else {
        Vec::new()
    };
    let right_partials = if group_by == GroupBy::Right || join_type.keeps_unmatched_right() {
        partials(
            &right,
            &left,
            matches.iter().map(|&(li, ri)| (ri, li)),
            group_by == GroupBy::Right,
        )
    } else {
        Vec::new()
    };

    Ok(PartitionOutput {
        pairs,
        left: left_partials,
        right: right_partials,
    })
}

/// One partial per entry of `side`, counting (and optionally collecting) its matches.
fn partials<X, O>(
    side: &[Entry<X>],
    other: &[Entry<O>],
    matches: impl Iterator<Item = (usize, usize)>,
    collect: bool,
) -> Vec<Partial<X, O>>
where
    X: Clone,
    O: Clone,
{
    let mut partials: Vec<Partial<X, O>> = side
        .iter()
        .map(|e| Partial {
            id: e.id,
            value: e.value.clone(),
            matched: 0,
            others: Vec::new(),
        })
        .collect();
    for (si, oi) in matches {
        partials[si].matched += 1;
        if collect {
            partials[si].others.push(other[oi].value.clone());
        }
    }
    partials
}

fn finish_side<X, O, Row, G, U>(
    partials: Partitioned<Partial<X, O>>,
    num_partitions: usize,
    grouping: bool,
    keep_unmatched: bool,
    group_row: G,
    only_row: U,
) -> JoinResult<Partitioned<Row>>
where
    X: Send,
    O: Send,
    Row: Send,
    G: Fn(X, Vec<O>) -> Row + Send + Sync,
    U: Fn(X) -> Row + Send + Sync,
{
    if partials.is_empty() {
        return Ok(Partitioned::empty(num_partitions));
    }
    Ok(reconcile(partials, num_partitions)?.map_partitions(|merged| {
        merged
            .into_iter()
            .filter_map(|(value, matched, others)| {
                if grouping {
                    (matched > 0 || keep_unmatched).then(|| group_row(value, others))
                } else {
                    (matched == 0 && keep_unmatched).then(|| only_row(value))
                }
            })
            .collect()
    }))
}

fn concat<T>(_: usize, mut a: Vec<T>, b: Vec<T>) -> Vec<T> {
    a.extend(b);
    a
}

fn typed<L, R, O, C, V>(
    left: GenomicDataset<L>,
    right: GenomicDataset<R>,
    config: &JoinConfig,
    join_type: JoinType,
    group_by: GroupBy,
    convert: C,
    view: V,
) -> JoinResult<GenomicDataset<O>>
where
    L: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    O: Send + Sync + 'static,
    C: Fn(JoinRow<L, R>) -> Option<O> + Send + Sync,
    V: Fn(&O) -> (Vec<&L>, Vec<&R>) + Send + Sync + 'static,
{
    config.install(|| {
        Ok::<_, JoinError>(
            shuffle_output(left, right, config, join_type, group_by)?.into_typed(convert, view),
        )
    })?
}

/// Shuffle joins with `self` as the left side.
pub trait ShuffleRegionJoin<L>: Sized {
    fn shuffle_region_join<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(L, R)>>
    where
        R: Clone + Send + Sync + 'static;

    fn left_outer_shuffle_region_join<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(L, Option<R>)>>
    where
        R: Clone + Send + Sync + 'static;

    fn right_outer_shuffle_region_join<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Option<L>, R)>>
    where
        R: Clone + Send + Sync + 'static;

    fn full_outer_shuffle_region_join<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Option<L>, Option<R>)>>
    where
        R: Clone + Send + Sync + 'static;

    fn shuffle_region_join_and_group_by_left<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(L, Vec<R>)>>
    where
        R: Clone + Send + Sync + 'static;

    /// Unmatched left records get an empty group.
    fn left_outer_shuffle_region_join_and_group_by_left<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(L, Vec<R>)>>
    where
        R: Clone + Send + Sync + 'static;

    /// Unmatched right records appear as `(None, vec![right])`.
    fn right_outer_shuffle_region_join_and_group_by_left<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Option<L>, Vec<R>)>>
    where
        R: Clone + Send + Sync + 'static;

    fn shuffle_region_join_and_group_by_right<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Vec<L>, R)>>
    where
        R: Clone + Send + Sync + 'static;

    fn right_outer_shuffle_region_join_and_group_by_right<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Vec<L>, R)>>
    where
        R: Clone + Send + Sync + 'static;

    /// Unmatched left records appear as `(vec![left], None)`.
    fn left_outer_shuffle_region_join_and_group_by_right<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Vec<L>, Option<R>)>>
    where
        R: Clone + Send + Sync + 'static;
}

impl<L> ShuffleRegionJoin<L> for GenomicDataset<L>
where
    L: Clone + Send + Sync + 'static,
{
    fn shuffle_region_join<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(L, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        typed(self, right, config, JoinType::Inner, GroupBy::None, |row| match row {
            JoinRow::Pair(l, r) => Some((l, r)),
            _ => None,
        }, output::view_pair)
    }

    fn left_outer_shuffle_region_join<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(L, Option<R>)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        typed(self, right, config, JoinType::LeftOuter, GroupBy::None, |row| match row {
            JoinRow::Pair(l, r) => Some((l, Some(r))),
            JoinRow::LeftOnly(l) => Some((l, None)),
            _ => None,
        }, output::view_optional_right)
    }

    fn right_outer_shuffle_region_join<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Option<L>, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        typed(self, right, config, JoinType::RightOuter, GroupBy::None, |row| match row {
            JoinRow::Pair(l, r) => Some((Some(l), r)),
            JoinRow::RightOnly(r) => Some((None, r)),
            _ => None,
        }, output::view_optional_left)
    }

    fn full_outer_shuffle_region_join<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Option<L>, Option<R>)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        typed(self, right, config, JoinType::FullOuter, GroupBy::None, |row| match row {
            JoinRow::Pair(l, r) => Some((Some(l), Some(r))),
            JoinRow::LeftOnly(l) => Some((Some(l), None)),
            JoinRow::RightOnly(r) => Some((None, Some(r))),
            _ => None,
        }, output::view_both_optional)
    }

    fn shuffle_region_join_and_group_by_left<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(L, Vec<R>)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        typed(self, right, config, JoinType::Inner, GroupBy::Left, left_group, output::view_left_group)
    }

    fn left_outer_shuffle_region_join_and_group_by_left<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(L, Vec<R>)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        typed(self, right, config, JoinType::LeftOuter, GroupBy::Left, left_group, output::view_left_group)
    }

    fn right_outer_shuffle_region_join_and_group_by_left<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Option<L>, Vec<R>)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        typed(self, right, config, JoinType::RightOuter, GroupBy::Left, |row| match row {
            JoinRow::LeftGroup(l, rs) => Some((Some(l), rs)),
            JoinRow::RightOnly(r) => Some((None, vec![r])),
            _ => None,
        }, output::view_optional_left_group)
    }

    fn shuffle_region_join_and_group_by_right<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Vec<L>, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        typed(self, right, config, JoinType::Inner, GroupBy::Right, right_group, output::view_right_group)
    }

    fn right_outer_shuffle_region_join_and_group_by_right<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Vec<L>, R)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        typed(self, right, config, JoinType::RightOuter, GroupBy::Right, right_group, output::view_right_group)
    }

    fn left_outer_shuffle_region_join_and_group_by_right<R>(
        self,
        right: GenomicDataset<R>,
        config: &JoinConfig,
    ) -> JoinResult<GenomicDataset<(Vec<L>, Option<R>)>>
    where
        R: Clone + Send + Sync + 'static,
    {
        typed(self, right, config, JoinType::LeftOuter, GroupBy::Right, |row| match row {
            JoinRow::RightGroup(ls, r) => Some((ls, Some(r))),
            JoinRow::LeftOnly(l) => Some((vec![l], None)),
            _ => None,
        }, output::view_right_group_optional)
    }
}

fn left_group<L, R>(row: JoinRow<L, R>) -> Option<(L, Vec<R>)> {
    match row {
        JoinRow::LeftGroup(l, rs) => Some((l, rs)),
        _ => None,
    }
}

fn right_group<L, R>(row: JoinRow<L, R>) -> Option<(Vec<L>, R)> {
    match row {
        JoinRow::RightGroup(ls, r) => Some((ls, r)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rangejoin_core::models::SequenceDictionary;
    use rstest::*;

    type Named = (ReferenceRegion, &'static str);
    type Multi = (Vec<ReferenceRegion>, &'static str);

    fn sequences() -> SequenceDictionary {
        SequenceDictionary::from_lengths(vec![("chr1", 10_000), ("chr2", 10_000)]).unwrap()
    }

    fn named(items: &[(&str, &'static str)], partitions: usize) -> GenomicDataset<Named> {
        GenomicDataset::from_vec(
            items
                .iter()
                .map(|(r, n)| (r.parse::<ReferenceRegion>().unwrap(), *n))
                .collect(),
            partitions,
            sequences(),
            |(r, _): &Named| vec![r.clone()],
        )
    }

    fn multi(items: Vec<(Vec<&str>, &'static str)>, partitions: usize) -> GenomicDataset<Multi> {
        GenomicDataset::from_vec(
            items
                .into_iter()
                .map(|(rs, n)| (rs.iter().map(|r| r.parse().unwrap()).collect(), n))
                .collect(),
            partitions,
            sequences(),
            |(rs, _): &Multi| rs.clone(),
        )
    }

    fn sorted<A: Ord>(mut rows: Vec<A>) -> Vec<A> {
        rows.sort();
        rows
    }

    /// Left records in two sorted partitions: chr1:[0,30) and chr1:[150,180).
    #[fixture]
    fn two_partition_left() -> GenomicDataset<Named> {
        named(
            &[("chr1:0-10", "a"), ("chr1:20-30", "b"), ("chr1:150-160", "c"), ("chr1:170-180", "d")],
            1,
        )
        .sort(Some(2), ValidationStringency::Strict)
        .unwrap()
    }

    #[test]
    fn test_full_outer_example() {
        let left = named(&[("chr1:0-10", "a")], 1);
        let right = named(&[("chr1:5-15", "x"), ("chr1:20-30", "y")], 1);
        let joined = left
            .full_outer_shuffle_region_join(right, &JoinConfig::default())
            .unwrap();
        let rows: Vec<(Option<&str>, Option<&str>)> = joined
            .into_records()
            .collect()
            .into_iter()
            .map(|(l, r)| (l.map(|l| l.1), r.map(|r| r.1)))
            .collect();
        assert_eq!(sorted(rows), vec![(None, Some("y")), (Some("a"), Some("x"))]);
    }

    #[test]
    fn test_grouped_left_example() {
        let left = named(&[("chr1:0-100", "a")], 1);
        let right = named(&[("chr1:10-20", "p"), ("chr1:50-60", "q")], 2);
        let joined = left
            .shuffle_region_join_and_group_by_left(right, &JoinConfig::default())
            .unwrap();
        let rows = joined.into_records().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.1, "a");
        assert_eq!(sorted(rows[0].1.iter().map(|r| r.1).collect::<Vec<_>>()), vec!["p", "q"]);
    }

    #[rstest]
    fn test_routed_copies_are_reported_once(two_partition_left: GenomicDataset<Named>) {
        let right = multi(
            vec![
                (vec!["chr1:40-50", "chr1:200-210"], "unmatched"),
                (vec!["chr1:5-6", "chr1:175-176"], "both"),
                (vec!["chr1:25-160"], "straddle"),
            ],
            2,
        );

        let outer = shuffle_join(
            two_partition_left.clone(),
            right.clone(),
            &JoinConfig::default(),
            JoinType::RightOuter,
            GroupBy::None,
        )
        .unwrap();
        let mut rows: Vec<(Option<&str>, &str)> = outer
            .records()
            .iter()
            .map(|row| match row {
                JoinRow::Pair(l, r) => (Some(l.1), r.1),
                JoinRow::RightOnly(r) => (None, r.1),
                other => panic!("unexpected row {other:?}"),
            })
            .collect();
        rows.sort();
        assert_eq!(
            rows,
            vec![
                (None, "unmatched"),
                (Some("a"), "both"),
                (Some("b"), "straddle"),
                (Some("c"), "straddle"),
                (Some("d"), "both"),
            ]
        );

        let grouped = two_partition_left
            .shuffle_region_join_and_group_by_right(right, &JoinConfig::default())
            .unwrap();
        let mut groups: Vec<(&str, Vec<&str>)> = grouped
            .records()
            .iter()
            .map(|(ls, r)| (r.1, sorted(ls.iter().map(|l| l.1).collect())))
            .collect();
        groups.sort();
        assert_eq!(
            groups,
            vec![("both", vec!["a", "d"]), ("straddle", vec!["b", "c"])]
        );
    }

    #[rstest]
    #[case::left_sorted(true, false)]
    #[case::right_sorted(false, true)]
    #[case::both_sorted(true, true)]
    #[case::neither_sorted(false, false)]
    fn test_anchor_choice_does_not_change_pairs(#[case] sort_left: bool, #[case] sort_right: bool) {
        let mut left = named(
            &[("chr1:0-100", "l1"), ("chr1:90-95", "l2"), ("chr2:10-20", "l3"), ("chr1:500-600", "l4")],
            2,
        );
        let mut right = named(
            &[("chr1:50-60", "r1"), ("chr2:15-16", "r2"), ("chr1:550-551", "r3"), ("chr2:900-901", "r4")],
            3,
        );
        if sort_left {
            left = left.sort(Some(3), ValidationStringency::Strict).unwrap();
        }
        if sort_right {
            right = right.sort(Some(2), ValidationStringency::Strict).unwrap();
        }
        let joined = left
            .left_outer_shuffle_region_join(right, &JoinConfig::default())
            .unwrap();
        let rows: Vec<(&str, Option<&str>)> = joined
            .records()
            .iter()
            .map(|(l, r)| (l.1, r.as_ref().map(|r| r.1)))
            .collect();
        assert_eq!(
            sorted(rows),
            vec![("l1", Some("r1")), ("l2", None), ("l3", Some("r2")), ("l4", Some("r3"))]
        );
    }

    #[test]
    fn test_flank_matches_nearby_and_reports_unpadded() {
        let left = named(&[("chr1:100-110", "g")], 1);
        let right = named(&[("chr1:115-120", "near"), ("chr1:200-210", "far")], 1);
        let config = JoinConfig::default().with_flank_size(10);
        let joined = left.shuffle_region_join(right, &config).unwrap();
        assert_eq!(joined.count(), 1);
        let row = joined.records().iter().next().cloned().unwrap();
        assert_eq!(row.1.1, "near");
        assert_eq!(
            joined.regions_of(&row),
            vec!["chr1:100-110".parse().unwrap(), "chr1:115-120".parse().unwrap()]
        );
        assert!(joined.partition_map().bounds().is_none());
    }

    #[test]
    fn test_sorting_uses_configured_partitions() {
        let left = named(&[("chr1:0-10", "a"), ("chr1:100-110", "b"), ("chr1:200-210", "c")], 1);
        let right = named(&[("chr1:5-6", "x")], 1);
        let config = JoinConfig::default().with_partitions(3);
        let joined = shuffle_join(left, right, &config, JoinType::Inner, GroupBy::None).unwrap();
        assert_eq!(joined.num_partitions(), 3);
        assert_eq!(joined.count(), 1);
    }

    #[test]
    fn test_unmapped_records_follow_stringency() {
        let left = named(&[("chr1:0-10", "a")], 1)
            .sort(None, ValidationStringency::Strict)
            .unwrap();
        let right = multi(vec![(vec![], "nowhere"), (vec!["chr1:5-6"], "x")], 1);

        let lenient = shuffle_join(
            left.clone(),
            right.clone(),
            &JoinConfig::default(),
            JoinType::RightOuter,
            GroupBy::None,
        )
        .unwrap();
        assert_eq!(lenient.count(), 1);

        let strict = shuffle_join(
            left,
            right,
            &JoinConfig::default().with_stringency(ValidationStringency::Strict),
            JoinType::Inner,
            GroupBy::None,
        );
        assert!(matches!(
            strict,
            Err(JoinError::Partition(PartitionError::UnmappedRecord { partition: 0 }))
        ));
    }
}
