use num_traits::{PrimInt, Unsigned};

use super::Overlapper;
use rangejoin_core::models::Interval;

/// Lookahead used when deciding whether an interval covers enough of its
/// successors to be moved into a later component.
const MIN_COVERAGE: usize = 10;

/// An Augmented Interval List.
///
/// From the following article: <https://academic.oup.com/bioinformatics/article/35/23/4907/5509521>
///
/// Long intervals that swallow many of their successors are split off into
/// separate components, so each component's running max-end stays tight and
/// a query can stop scanning a component early. This keeps probes fast on
/// high-coverage inputs such as deep read piles.
///
/// ```
/// use rangejoin_overlaprs::{AIList, Overlapper, Interval};
///
/// let genes = vec![
///     Interval { start: 1000u64, end: 2000, val: "GENE1" },
///     Interval { start: 1500, end: 2500, val: "GENE2" },
///     Interval { start: 5000, end: 6000, val: "GENE3" },
/// ];
///
/// let ailist = AIList::build(genes);
/// assert_eq!(ailist.find(1800, 2200).len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct AIList<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    components: Vec<Component<I, T>>,
}

/// One start-sorted run of the decomposed list.
#[derive(Debug, Clone)]
struct Component<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    starts: Vec<I>,
    /// Running maximum of `end` up to and including each position.
    max_ends: Vec<I>,
    intervals: Vec<Interval<I, T>>,
}

impl<I, T> Component<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    fn new(intervals: Vec<Interval<I, T>>) -> Self {
        let starts = intervals.iter().map(|iv| iv.start).collect();
        let max_ends = intervals
            .iter()
            .scan(I::zero(), |max, iv| {
                *max = (*max).max(iv.end);
                Some(*max)
            })
            .collect();

        Component {
            starts,
            max_ends,
            intervals,
        }
    }

    /// Index one past the last interval starting before `end`.
    fn upper(&self, end: I) -> usize {
        self.starts.partition_point(|&s| s < end)
    }
}

impl<I, T> AIList<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    ///
    /// Split start-sorted `intervals` into the ones kept in the current
    /// component and the ones deferred to the next.
    ///
    /// An interval is deferred when at least [`MIN_COVERAGE`] of the next
    /// `2 * MIN_COVERAGE - 1` intervals end before it does.
    ///
    fn decompose(intervals: Vec<Interval<I, T>>) -> (Vec<Interval<I, T>>, Vec<Interval<I, T>>) {
        let covered: Vec<bool> = intervals
            .iter()
            .enumerate()
            .map(|(i, iv)| {
                intervals
                    .iter()
                    .skip(i + 1)
                    .take(MIN_COVERAGE * 2 - 1)
                    .filter(|next| next.end < iv.end)
                    .count()
                    >= MIN_COVERAGE
            })
            .collect();

        let mut kept = Vec::with_capacity(intervals.len());
        let mut deferred = Vec::new();
        for (iv, covers_successors) in intervals.into_iter().zip(covered) {
            if covers_successors {
                deferred.push(iv);
            } else {
                kept.push(iv);
            }
        }
        (kept, deferred)
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }
}

impl<I, T> Overlapper<I, T> for AIList<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    fn build(intervals: Vec<Interval<I, T>>) -> Self
    where
        Self: Sized,
    {
        let mut remaining = intervals;
        remaining.sort_by_key(|iv| iv.start);

        let mut components = Vec::new();
        loop {
            // the last interval of a run is never deferred, so every round shrinks `remaining`
            let (kept, deferred) = Self::decompose(remaining);
            components.push(Component::new(kept));
            if deferred.is_empty() {
                break;
            }
            remaining = deferred;
        }

        AIList { components }
    }

    fn find(&self, start: I, end: I) -> Vec<Interval<I, T>> {
        IterFind::new(self, start, end).cloned().collect()
    }

    fn find_iter<'a>(
        &'a self,
        start: I,
        end: I,
    ) -> Box<dyn Iterator<Item = &'a Interval<I, T>> + 'a> {
        Box::new(IterFind::new(self, start, end))
    }

    fn len(&self) -> usize {
        self.components.iter().map(|c| c.intervals.len()).sum()
    }
}

/// Lazily walks each component backwards from the query end.
#[derive(Debug)]
pub struct IterFind<'a, I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync + 'a,
{
    components: &'a [Component<I, T>],
    component: usize,
    /// Next position (exclusive) to inspect within the current component.
    cursor: Option<usize>,
    start: I,
    end: I,
}

impl<'a, I, T> IterFind<'a, I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync + 'a,
{
    fn new(ailist: &'a AIList<I, T>, start: I, end: I) -> Self {
        IterFind {
            components: &ailist.components,
            component: 0,
            cursor: None,
            start,
            end,
        }
    }
}

impl<'a, I, T> Iterator for IterFind<'a, I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync + 'a,
{
    type Item = &'a Interval<I, T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(component) = self.components.get(self.component) {
            let mut i = self.cursor.unwrap_or_else(|| component.upper(self.end));

            while i > 0 {
                i -= 1;
                if component.max_ends[i] <= self.start {
                    // nothing at or before i reaches the query
                    break;
                }
                let interval = &component.intervals[i];
                if interval.end > self.start {
                    self.cursor = Some(i);
                    return Some(interval);
                }
            }

            self.cursor = None;
            self.component += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntervalArray;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::{fixture, rstest};

    #[fixture]
    fn intervals() -> Vec<Interval<u64, &'static str>> {
        vec![
            Interval { start: 1, end: 5, val: "a" },
            Interval { start: 3, end: 7, val: "b" },
            Interval { start: 6, end: 10, val: "c" },
            Interval { start: 8, end: 12, val: "d" },
        ]
    }

    fn sorted_vals(hits: Vec<Interval<u64, &'static str>>) -> Vec<&'static str> {
        let mut vals: Vec<&str> = hits.iter().map(|iv| iv.val).collect();
        vals.sort();
        vals
    }

    #[rstest]
    #[case(2, 4, vec!["a", "b"])]
    #[case(9, 11, vec!["c", "d"])]
    #[case(13, 15, vec![])]
    #[case(0, 1, vec![])]
    fn test_find(
        intervals: Vec<Interval<u64, &'static str>>,
        #[case] start: u64,
        #[case] end: u64,
        #[case] expected: Vec<&str>,
    ) {
        let ailist = AIList::build(intervals);
        assert_eq!(ailist.len(), 4);
        assert_eq!(sorted_vals(ailist.find(start, end)), expected);
    }

    #[test]
    fn test_empty() {
        let ailist: AIList<u64, ()> = AIList::build(vec![]);
        assert!(ailist.is_empty());
        assert!(ailist.find(1, 2).is_empty());
    }

    #[test]
    fn test_decomposes_deep_coverage() {
        let iv = |start: u64, end: u64| Interval { start, end, val: () };
        let mut intervals = vec![iv(0, 1000)];
        intervals.extend((0..30).map(|i| iv(i * 10, i * 10 + 5)));

        let ailist = AIList::build(intervals);
        assert_eq!(ailist.num_components(), 2);
        assert_eq!(ailist.find(6, 8).len(), 1);
        assert_eq!(ailist.find(12, 14).len(), 2);
        assert_eq!(ailist.find(500, 600).len(), 1);
    }

    #[test]
    fn test_agrees_with_interval_array() {
        let mut rng = StdRng::seed_from_u64(17);
        let intervals: Vec<Interval<u64, usize>> = (0..500)
            .map(|i| {
                let start = rng.random_range(0..10_000u64);
                let width = rng.random_range(0..400u64);
                Interval { start, end: start + width, val: i }
            })
            .collect();

        let ailist = AIList::build(intervals.clone());
        let array = IntervalArray::build(intervals);

        for _ in 0..200 {
            let start = rng.random_range(0..10_000u64);
            let end = start + rng.random_range(0..300u64);
            let mut a: Vec<usize> = ailist.find_iter(start, end).map(|iv| iv.val).collect();
            let mut b: Vec<usize> = array.find_iter(start, end).map(|iv| iv.val).collect();
            a.sort();
            b.sort();
            assert_eq!(a, b, "query {start}-{end}");
        }
    }
}
