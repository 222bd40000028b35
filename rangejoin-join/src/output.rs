use std::sync::Arc;

use rangejoin_core::models::{ReferenceRegion, SequenceDictionary};
use rangejoin_partition::{GenomicDataset, Partitioned, RegionFn};

/// Which unmatched records a join reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
}

impl JoinType {
    pub fn keeps_unmatched_left(self) -> bool {
        matches!(self, JoinType::LeftOuter | JoinType::FullOuter)
    }

    pub fn keeps_unmatched_right(self) -> bool {
        matches!(self, JoinType::RightOuter | JoinType::FullOuter)
    }
}

/// Whether matches are reported one pair at a time or collected per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
    #[default]
    None,
    Left,
    Right,
}

///
/// One row of a join result.
///
/// Ungrouped joins produce `Pair`, `LeftOnly` and `RightOnly`; grouped joins
/// produce `LeftGroup` or `RightGroup` for the grouped side and the
/// one-sided variant for unmatched records of the other side.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinRow<L, R> {
    Pair(L, R),
    LeftOnly(L),
    RightOnly(R),
    LeftGroup(L, Vec<R>),
    RightGroup(Vec<L>, R),
}

impl<L, R> JoinRow<L, R> {
    /// Borrow the left and right records this row carries.
    pub fn sides(&self) -> (Vec<&L>, Vec<&R>) {
        match self {
            JoinRow::Pair(l, r) => (vec![l], vec![r]),
            JoinRow::LeftOnly(l) => (vec![l], Vec::new()),
            JoinRow::RightOnly(r) => (Vec::new(), vec![r]),
            JoinRow::LeftGroup(l, rs) => (vec![l], rs.iter().collect()),
            JoinRow::RightGroup(ls, r) => (ls.iter().collect(), vec![r]),
        }
    }
}

///
/// Region function for a joined record type.
///
/// Covering intervals are re-derived from the original left and right
/// records through `view`, so padding applied while matching never reaches
/// the result.
///
pub fn joined_region_fn<O, L, R, V>(left: RegionFn<L>, right: RegionFn<R>, view: V) -> RegionFn<O>
where
    O: 'static,
    L: 'static,
    R: 'static,
    V: Fn(&O) -> (Vec<&L>, Vec<&R>) + Send + Sync + 'static,
{
    Arc::new(move |out: &O| {
        let (ls, rs) = view(out);
        let mut regions: Vec<ReferenceRegion> = ls.into_iter().flat_map(|l| left(l)).collect();
        regions.extend(rs.into_iter().flat_map(|r| right(r)));
        regions
    })
}

pub fn join_row_region_fn<L, R>(left: RegionFn<L>, right: RegionFn<R>) -> RegionFn<JoinRow<L, R>>
where
    L: 'static,
    R: 'static,
{
    joined_region_fn(left, right, |row: &JoinRow<L, R>| row.sides())
}

/// Rows produced by a join, before they are given a concrete record type.
pub(crate) struct JoinOutput<L, R> {
    pub rows: Partitioned<JoinRow<L, R>>,
    pub sequences: SequenceDictionary,
    pub left_fn: RegionFn<L>,
    pub right_fn: RegionFn<R>,
}

impl<L, R> JoinOutput<L, R>
where
    L: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    pub fn into_dataset(self) -> GenomicDataset<JoinRow<L, R>> {
        let region_fn = join_row_region_fn(self.left_fn, self.right_fn);
        GenomicDataset::with_region_fn(self.rows, self.sequences, region_fn)
    }

    /// Convert every row with `convert`, dropping rows it rejects.
    pub fn into_typed<O, C, V>(self, convert: C, view: V) -> GenomicDataset<O>
    where
        O: Send + Sync + 'static,
        C: Fn(JoinRow<L, R>) -> Option<O> + Send + Sync,
        V: Fn(&O) -> (Vec<&L>, Vec<&R>) + Send + Sync + 'static,
    {
        let rows = self
            .rows
            .map_partitions(|rows| rows.into_iter().filter_map(&convert).collect());
        let region_fn = joined_region_fn(self.left_fn, self.right_fn, view);
        GenomicDataset::with_region_fn(rows, self.sequences, region_fn)
    }
}

pub fn view_pair<L, R>(row: &(L, R)) -> (Vec<&L>, Vec<&R>) {
    (vec![&row.0], vec![&row.1])
}

pub fn view_optional_left<L, R>(row: &(Option<L>, R)) -> (Vec<&L>, Vec<&R>) {
    (row.0.iter().collect(), vec![&row.1])
}

pub fn view_optional_right<L, R>(row: &(L, Option<R>)) -> (Vec<&L>, Vec<&R>) {
    (vec![&row.0], row.1.iter().collect())
}

pub fn view_both_optional<L, R>(row: &(Option<L>, Option<R>)) -> (Vec<&L>, Vec<&R>) {
    (row.0.iter().collect(), row.1.iter().collect())
}

pub fn view_left_group<L, R>(row: &(L, Vec<R>)) -> (Vec<&L>, Vec<&R>) {
    (vec![&row.0], row.1.iter().collect())
}

pub fn view_right_group<L, R>(row: &(Vec<L>, R)) -> (Vec<&L>, Vec<&R>) {
    (row.0.iter().collect(), vec![&row.1])
}

pub fn view_optional_left_group<L, R>(row: &(Option<L>, Vec<R>)) -> (Vec<&L>, Vec<&R>) {
    (row.0.iter().collect(), row.1.iter().collect())
}

pub fn view_right_group_optional<L, R>(row: &(Vec<L>, Option<R>)) -> (Vec<&L>, Vec<&R>) {
    (row.0.iter().collect(), row.1.iter().collect())
}
