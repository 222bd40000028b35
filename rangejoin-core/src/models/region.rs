use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::RegionError;

/// Sentinel end coordinate for open-ended regions.
pub const UNBOUNDED_END: u64 = u64::MAX;

///
/// An immutable, half-open `[start, end)` span on a named contig.
///
/// The derived ordering is purely lexicographic: contig name, then start,
/// then end. Rank-aware ordering lives with the sort machinery, which
/// consults a [`SequenceDictionary`](crate::models::SequenceDictionary).
///
#[derive(Eq, PartialEq, Hash, Debug, Clone, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceRegion {
    pub reference_name: String,
    pub start: u64,
    pub end: u64,
}

impl ReferenceRegion {
    pub fn new(
        reference_name: impl Into<String>,
        start: u64,
        end: u64,
    ) -> Result<Self, RegionError> {
        let reference_name = reference_name.into();
        if start > end {
            return Err(RegionError::InvalidBounds {
                name: reference_name,
                start,
                end,
            });
        }
        Ok(ReferenceRegion {
            reference_name,
            start,
            end,
        })
    }

    /// A region running from `start` to the end of the contig, whatever its length.
    pub fn unbounded_from(reference_name: impl Into<String>, start: u64) -> Self {
        ReferenceRegion {
            reference_name: reference_name.into(),
            start,
            end: UNBOUNDED_END,
        }
    }

    /// A region covering an entire contig.
    pub fn whole_contig(reference_name: impl Into<String>) -> Self {
        Self::unbounded_from(reference_name, 0)
    }

    pub fn width(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_open_ended(&self) -> bool {
        self.end == UNBOUNDED_END
    }

    pub fn same_contig(&self, other: &ReferenceRegion) -> bool {
        self.reference_name == other.reference_name
    }

    ///
    /// Whether the two regions share at least one coordinate.
    ///
    /// Symmetric. A zero-width region overlaps any region strictly containing
    /// its position.
    ///
    pub fn overlaps(&self, other: &ReferenceRegion) -> bool {
        self.same_contig(other) && self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely inside this region.
    pub fn covers(&self, other: &ReferenceRegion) -> bool {
        self.same_contig(other) && self.start <= other.start && other.end <= self.end
    }

    ///
    /// Extend both bounds by `by` positions; a negative `by` shrinks.
    ///
    /// Growing saturates at coordinate 0 and leaves open ends open. Shrinking
    /// past the midpoint collapses the region to an empty span at the
    /// midpoint. Whenever neither clamp applies, `pad(n).pad(-n)` is the
    /// identity.
    ///
    pub fn pad(&self, by: i64) -> ReferenceRegion {
        let amount = by.unsigned_abs();
        let (start, end) = if by >= 0 {
            let end = if self.is_open_ended() {
                UNBOUNDED_END
            } else {
                self.end.saturating_add(amount)
            };
            (self.start.saturating_sub(amount), end)
        } else {
            let start = self.start.saturating_add(amount);
            let end = if self.is_open_ended() {
                UNBOUNDED_END
            } else {
                self.end.saturating_sub(amount)
            };
            if start > end {
                let mid = self.start + self.width() / 2;
                (mid, mid)
            } else {
                (start, end)
            }
        };

        ReferenceRegion {
            reference_name: self.reference_name.clone(),
            start,
            end,
        }
    }

    /// The smallest region covering both inputs.
    pub fn hull(&self, other: &ReferenceRegion) -> Result<ReferenceRegion, RegionError> {
        if !self.same_contig(other) {
            return Err(RegionError::DifferentContigs(
                self.reference_name.clone(),
                other.reference_name.clone(),
            ));
        }
        Ok(ReferenceRegion {
            reference_name: self.reference_name.clone(),
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        })
    }

    pub fn intersection(&self, other: &ReferenceRegion) -> Option<ReferenceRegion> {
        if !self.overlaps(other) {
            return None;
        }
        Some(ReferenceRegion {
            reference_name: self.reference_name.clone(),
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Gap between two regions on the same contig; `Some(0)` when they overlap.
    pub fn distance(&self, other: &ReferenceRegion) -> Option<u64> {
        if !self.same_contig(other) {
            return None;
        }
        if self.overlaps(other) {
            Some(0)
        } else if self.end <= other.start {
            Some(other.start - self.end)
        } else {
            Some(self.start - other.end)
        }
    }
}

impl Display for ReferenceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open_ended() {
            write!(f, "{}:{}-", self.reference_name, self.start)
        } else {
            write!(f, "{}:{}-{}", self.reference_name, self.start, self.end)
        }
    }
}

impl FromStr for ReferenceRegion {
    type Err = RegionError;

    /// Parses `chr:start-end`; an empty end (`chr:start-`) is open-ended.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, span) = s
            .rsplit_once(':')
            .ok_or_else(|| RegionError::RegionParseError(s.to_string()))?;
        let (start, end) = span
            .split_once('-')
            .ok_or_else(|| RegionError::RegionParseError(s.to_string()))?;

        let start = start
            .trim()
            .parse::<u64>()
            .map_err(|_| RegionError::RegionParseError(s.to_string()))?;
        let end = match end.trim() {
            "" => UNBOUNDED_END,
            e => e
                .parse::<u64>()
                .map_err(|_| RegionError::RegionParseError(s.to_string()))?,
        };

        if name.is_empty() {
            return Err(RegionError::RegionParseError(s.to_string()));
        }
        ReferenceRegion::new(name, start, end)
    }
}
