use num_traits::{PrimInt, Unsigned, identities::zero};
use std::cmp::Ordering::{self};

/// A bare `[start, end)` span carrying a payload, the unit stored in the
/// per-contig overlap indexes. Ordered by start, then end; the payload does
/// not take part in ordering or equality.
#[derive(Eq, Debug, Clone)]
pub struct Interval<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Clone + Send + Sync,
{
    pub start: I,
    pub end: I,
    pub val: T,
}

impl<I, T> Interval<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Clone + Send + Sync,
{
    /// Number of positions shared with `other`, zero when disjoint.
    #[inline]
    pub fn intersect(&self, other: &Interval<I, T>) -> I {
        std::cmp::min(self.end, other.end)
            .checked_sub(std::cmp::max(&self.start, &other.start))
            .unwrap_or_else(zero::<I>)
    }

    /// Half-open overlap test against `[start, end)`.
    #[inline]
    pub fn overlap(&self, start: I, end: I) -> bool {
        self.start < end && self.end > start
    }

    #[inline]
    pub fn width(&self) -> I {
        self.end.checked_sub(&self.start).unwrap_or_else(zero::<I>)
    }
}

impl<I, T> Ord for Interval<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    #[inline]
    fn cmp(&self, other: &Interval<I, T>) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.end.cmp(&other.end))
    }
}

impl<I, T> PartialOrd for Interval<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Eq + Clone + Send + Sync,
{
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I, T> PartialEq for Interval<I, T>
where
    I: PrimInt + Unsigned + Send + Sync,
    T: Clone + Send + Sync,
{
    #[inline]
    fn eq(&self, other: &Interval<I, T>) -> bool {
        self.start == other.start && self.end == other.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_intersect_and_overlap() {
        let a = Interval { start: 10u64, end: 20, val: () };
        let b = Interval { start: 15u64, end: 30, val: () };
        let c = Interval { start: 20u64, end: 25, val: () };

        assert_eq!(a.intersect(&b), 5);
        assert_eq!(a.intersect(&c), 0);
        assert!(a.overlap(b.start, b.end));
        assert!(!a.overlap(c.start, c.end));
        assert_eq!(b.width(), 15);
    }
}
