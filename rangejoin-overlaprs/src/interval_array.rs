use num_traits::{PrimInt, Unsigned, identities::zero};

use super::Overlapper;
use rangejoin_core::models::Interval;

/// A start-sorted interval array with a width bound.
///
/// Queries binary-search for the first interval that could reach the query
/// (`query.start - max_width`) and scan forward until starts pass the query
/// end. Unlike [`AIList`](crate::AIList), intervals are kept in a single
/// sorted run, so [`iter`](IntervalArray::iter) walks them in start order
/// and query hits also come back in start order.
///
/// ```
/// use rangejoin_overlaprs::{IntervalArray, Overlapper, Interval};
///
/// let reads = vec![
///     Interval { start: 200u64, end: 250, val: "read2" },
///     Interval { start: 100, end: 150, val: "read1" },
///     Interval { start: 225, end: 275, val: "read3" },
/// ];
/// let array = IntervalArray::build(reads);
///
/// let hits: Vec<&str> = array.find_iter(210, 240).map(|iv| iv.val).collect();
/// assert_eq!(hits, vec!["read2", "read3"]);
/// ```
#[derive(Debug, Clone)]
pub struct IntervalArray<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    intervals: Vec<Interval<I, T>>,
    /// Width of the widest stored interval
    max_width: I,
}

impl<I, T> Overlapper<I, T> for IntervalArray<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    fn build(mut intervals: Vec<Interval<I, T>>) -> Self
    where
        Self: Sized,
    {
        intervals.sort();
        let max_width = intervals
            .iter()
            .map(|iv| iv.width())
            .max()
            .unwrap_or_else(zero::<I>);

        IntervalArray {
            intervals,
            max_width,
        }
    }

    fn find(&self, start: I, end: I) -> Vec<Interval<I, T>> {
        self.find_iter_sorted(start, end).cloned().collect()
    }

    fn find_iter<'a>(
        &'a self,
        start: I,
        end: I,
    ) -> Box<dyn Iterator<Item = &'a Interval<I, T>> + 'a> {
        Box::new(self.find_iter_sorted(start, end))
    }

    fn len(&self) -> usize {
        self.intervals.len()
    }
}

impl<I, T> IntervalArray<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    /// All intervals in ascending `(start, end)` order.
    pub fn iter(&self) -> std::slice::Iter<'_, Interval<I, T>> {
        self.intervals.iter()
    }

    /// Overlapping intervals, yielded in ascending start order.
    pub fn find_iter_sorted(&self, start: I, end: I) -> IterFind<'_, I, T> {
        let floor = start.checked_sub(&self.max_width).unwrap_or_else(zero::<I>);
        IterFind {
            intervals: &self.intervals,
            pos: self.intervals.partition_point(|iv| iv.start < floor),
            start,
            end,
        }
    }

    pub fn max_width(&self) -> I {
        self.max_width
    }
}

/// Iterator returned by [`IntervalArray::find_iter_sorted`].
#[derive(Debug)]
pub struct IterFind<'a, I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync + 'a,
{
    intervals: &'a [Interval<I, T>],
    pos: usize,
    start: I,
    end: I,
}

impl<'a, I, T> Iterator for IterFind<'a, I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync + 'a,
{
    type Item = &'a Interval<I, T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(interval) = self.intervals.get(self.pos) {
            if interval.start >= self.end {
                // starts are sorted, nothing further can overlap
                self.pos = self.intervals.len();
                return None;
            }
            self.pos += 1;
            if interval.overlap(self.start, self.end) {
                return Some(interval);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn intervals() -> Vec<Interval<u64, &'static str>> {
        vec![
            Interval { start: 6, end: 10, val: "c" },
            Interval { start: 1, end: 5, val: "a" },
            Interval { start: 8, end: 12, val: "d" },
            Interval { start: 3, end: 7, val: "b" },
            Interval { start: 0, end: 100, val: "wide" },
        ]
    }

    #[rstest]
    fn test_iter_is_sorted(intervals: Vec<Interval<u64, &'static str>>) {
        let array = IntervalArray::build(intervals);
        let vals: Vec<&str> = array.iter().map(|iv| iv.val).collect();
        assert_eq!(vals, vec!["wide", "a", "b", "c", "d"]);
        assert_eq!(array.max_width(), 100);
        assert_eq!(array.len(), 5);
    }

    #[rstest]
    #[case(2, 4, vec!["wide", "a", "b"])]
    #[case(9, 11, vec!["wide", "c", "d"])]
    #[case(12, 15, vec!["wide"])]
    #[case(100, 150, vec![])]
    #[case(5, 6, vec!["wide", "b"])]
    fn test_find_iter_sorted(
        intervals: Vec<Interval<u64, &'static str>>,
        #[case] start: u64,
        #[case] end: u64,
        #[case] expected: Vec<&str>,
    ) {
        let array = IntervalArray::build(intervals);
        let vals: Vec<&str> = array.find_iter_sorted(start, end).map(|iv| iv.val).collect();
        assert_eq!(vals, expected);
        assert_eq!(array.find(start, end).len(), expected.len());
    }

    #[test]
    fn test_empty() {
        let array: IntervalArray<u64, ()> = IntervalArray::build(vec![]);
        assert!(array.is_empty());
        assert_eq!(array.find_iter(0, 10).count(), 0);
    }
}
