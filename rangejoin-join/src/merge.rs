//! Per-partition streaming overlap merge.

use std::cmp::Ordering;

use rangejoin_core::models::ReferenceRegion;
use rangejoin_partition::SortKey;

use crate::errors::{JoinError, JoinResult};

/// One region of a record, as placed in a co-partitioned join input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    /// ordering key of `region`
    pub sort: SortKey,
    /// matching interval; left regions are already padded by the flank
    pub region: ReferenceRegion,
    /// record id, shared by every entry of the same record
    pub id: u64,
    pub value: T,
}

pub fn check_sorted<T>(entries: &[Entry<T>], side: &'static str, partition: usize) -> JoinResult<()> {
    if entries.windows(2).all(|w| w[0].sort <= w[1].sort) {
        Ok(())
    } else {
        Err(JoinError::UnsortedPartition { side, partition })
    }
}

///
/// All overlapping `(left, right)` index pairs of two sorted entry lists.
///
/// Walks `right` in order while keeping a window of left entries that
/// could still overlap: a left entry joins the window once it starts
/// before the current right entry ends, and leaves it once it ends at or
/// before the current right start (or lies on an earlier contig). Each
/// entry enters and leaves the window once.
///
pub fn sweep<A, B>(left: &[Entry<A>], right: &[Entry<B>]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut window: Vec<usize> = Vec::new();
    let mut next = 0;

    for (ri, r) in right.iter().enumerate() {
        while next < left.len() && starts_before_end(&left[next], r) {
            window.push(next);
            next += 1;
        }

        window.retain(|&li| {
            let l = &left[li];
            l.sort.contig == r.sort.contig && l.region.end > r.region.start
        });

        for &li in &window {
            if left[li].region.overlaps(&r.region) {
                pairs.push((li, ri));
            }
        }
    }
    pairs
}

fn starts_before_end<A, B>(l: &Entry<A>, r: &Entry<B>) -> bool {
    l.sort
        .contig
        .cmp(&r.sort.contig)
        .then(l.region.start.cmp(&r.region.end))
        == Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rangejoin_partition::ContigKey;
    use rstest::*;

    fn entry(contig: u32, start: u64, end: u64) -> Entry<()> {
        Entry {
            sort: SortKey {
                contig: ContigKey::Rank(contig),
                start,
            },
            region: ReferenceRegion::new(format!("chr{contig}"), start, end).unwrap(),
            id: 0,
            value: (),
        }
    }

    fn entries(spans: &[(u32, u64, u64)]) -> Vec<Entry<()>> {
        let mut entries: Vec<Entry<()>> = spans.iter().map(|&(c, s, e)| entry(c, s, e)).collect();
        entries.sort_by(|a, b| a.sort.cmp(&b.sort));
        entries
    }

    fn brute_force<A, B>(left: &[Entry<A>], right: &[Entry<B>]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (li, l) in left.iter().enumerate() {
            for (ri, r) in right.iter().enumerate() {
                if l.region.overlaps(&r.region) {
                    pairs.push((li, ri));
                }
            }
        }
        pairs.sort();
        pairs
    }

    #[rstest]
    #[case(vec![(1, 0, 100)], vec![(1, 10, 20), (1, 50, 60)], vec![(0, 0), (0, 1)])]
    #[case(vec![(1, 0, 10)], vec![(1, 10, 20)], vec![])]
    #[case(vec![(1, 0, 10), (2, 0, 10)], vec![(2, 5, 6)], vec![(1, 0)])]
    #[case(vec![(1, 0, 1000), (1, 10, 20)], vec![(1, 15, 16), (1, 500, 501)], vec![(0, 0), (0, 1), (1, 0)])]
    #[case(vec![(1, 0, 10)], vec![(1, 5, 5)], vec![(0, 0)])]
    fn test_sweep_cases(
        #[case] left: Vec<(u32, u64, u64)>,
        #[case] right: Vec<(u32, u64, u64)>,
        #[case] expected: Vec<(usize, usize)>,
    ) {
        let mut pairs = sweep(&entries(&left), &entries(&right));
        pairs.sort();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_sweep_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut spans = |n: usize| -> Vec<(u32, u64, u64)> {
            (0..n)
                .map(|_| {
                    let start = rng.random_range(0..5_000u64);
                    (rng.random_range(1..4u32), start, start + rng.random_range(0..400u64))
                })
                .collect()
        };
        let left = entries(&spans(300));
        let right = entries(&spans(300));

        let mut pairs = sweep(&left, &right);
        pairs.sort();
        assert_eq!(pairs, brute_force(&left, &right));
    }

    #[test]
    fn test_unsorted_input_is_rejected() {
        let unsorted = vec![entry(1, 50, 60), entry(1, 10, 20)];
        assert!(matches!(
            check_sorted(&unsorted, "left", 3),
            Err(JoinError::UnsortedPartition { side: "left", partition: 3 })
        ));
        assert!(check_sorted(&entries(&[(1, 50, 60), (1, 10, 20)]), "left", 3).is_ok());
    }
}
