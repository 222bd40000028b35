use std::cmp::Ordering;

use fxhash::FxHashMap;
use rangejoin_core::models::{ReferenceRegion, SequenceDictionary};

use crate::errors::PartitionError;

/// How contigs are ordered relative to each other when sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SortStrategy {
    /// Contigs by name.
    Lexicographic,
    /// Contigs by their rank in the sequence dictionary.
    #[default]
    Ranked,
}

///
/// Position of a contig in the active ordering.
///
/// Ranked contigs sort before named ones, so a contig missing from a ranked
/// dictionary lands after every known contig instead of failing comparisons.
///
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContigKey {
    Rank(u32),
    Name(String),
}

/// Sort key of a single-region record: contig position, then start.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    pub contig: ContigKey,
    pub start: u64,
}

/// Total order over regions under a [`SortStrategy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOrdering {
    strategy: SortStrategy,
    ranks: FxHashMap<String, u32>,
}

impl RegionOrdering {
    pub fn lexicographic() -> Self {
        RegionOrdering {
            strategy: SortStrategy::Lexicographic,
            ranks: FxHashMap::default(),
        }
    }

    /// Ranked ordering; every contig in `sequences` must carry a rank.
    pub fn ranked(sequences: &SequenceDictionary) -> Result<Self, PartitionError> {
        if !sequences.has_ordering() {
            return Err(PartitionError::MissingContigOrdering);
        }
        let ranks = sequences
            .iter()
            .filter_map(|r| r.index.map(|i| (r.name.clone(), i)))
            .collect();
        Ok(RegionOrdering {
            strategy: SortStrategy::Ranked,
            ranks,
        })
    }

    pub fn new(
        strategy: SortStrategy,
        sequences: &SequenceDictionary,
    ) -> Result<Self, PartitionError> {
        match strategy {
            SortStrategy::Lexicographic => Ok(Self::lexicographic()),
            SortStrategy::Ranked => Self::ranked(sequences),
        }
    }

    /// Ranked when the dictionary allows it, lexicographic otherwise.
    pub fn for_dictionary(sequences: &SequenceDictionary) -> Self {
        Self::ranked(sequences).unwrap_or_else(|_| Self::lexicographic())
    }

    pub fn strategy(&self) -> SortStrategy {
        self.strategy
    }

    /// `None` under ranked ordering when the contig has no rank.
    pub fn contig_key(&self, name: &str) -> Option<ContigKey> {
        match self.strategy {
            SortStrategy::Lexicographic => Some(ContigKey::Name(name.to_string())),
            SortStrategy::Ranked => self.ranks.get(name).map(|&r| ContigKey::Rank(r)),
        }
    }

    /// Like [`contig_key`](Self::contig_key), placing unranked contigs last.
    pub fn contig_key_or_name(&self, name: &str) -> ContigKey {
        self.contig_key(name)
            .unwrap_or_else(|| ContigKey::Name(name.to_string()))
    }

    pub fn key(&self, region: &ReferenceRegion) -> Option<SortKey> {
        self.contig_key(&region.reference_name).map(|contig| SortKey {
            contig,
            start: region.start,
        })
    }

    pub fn key_or_fallback(&self, region: &ReferenceRegion) -> SortKey {
        SortKey {
            contig: self.contig_key_or_name(&region.reference_name),
            start: region.start,
        }
    }

    /// Compare by contig position, start, then end.
    pub fn compare(&self, a: &ReferenceRegion, b: &ReferenceRegion) -> Ordering {
        self.key_or_fallback(a)
            .cmp(&self.key_or_fallback(b))
            .then(a.end.cmp(&b.end))
    }

    /// Compare two regions by where they end: contig position, then end.
    pub fn compare_ends(&self, a: &ReferenceRegion, b: &ReferenceRegion) -> Ordering {
        self.contig_key_or_name(&a.reference_name)
            .cmp(&self.contig_key_or_name(&b.reference_name))
            .then(a.end.cmp(&b.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn sequences() -> SequenceDictionary {
        SequenceDictionary::from_lengths(vec![("chr2", 1000), ("chr10", 1000), ("chr1", 1000)])
            .unwrap()
    }

    fn region(s: &str) -> ReferenceRegion {
        s.parse().unwrap()
    }

    #[rstest]
    fn test_ranked_follows_dictionary(sequences: SequenceDictionary) {
        let ordering = RegionOrdering::ranked(&sequences).unwrap();
        let mut regions = vec![region("chr1:0-10"), region("chr10:5-10"), region("chr2:50-60")];
        regions.sort_by(|a, b| ordering.compare(a, b));
        assert_eq!(
            regions,
            vec![region("chr2:50-60"), region("chr10:5-10"), region("chr1:0-10")]
        );
    }

    #[rstest]
    fn test_lexicographic_ignores_ranks(sequences: SequenceDictionary) {
        let ordering = RegionOrdering::new(SortStrategy::Lexicographic, &sequences).unwrap();
        let mut regions = vec![region("chr2:50-60"), region("chr10:5-10"), region("chr1:0-10")];
        regions.sort_by(|a, b| ordering.compare(a, b));
        assert_eq!(
            regions,
            vec![region("chr1:0-10"), region("chr10:5-10"), region("chr2:50-60")]
        );
    }

    #[rstest]
    fn test_unranked_contig(sequences: SequenceDictionary) {
        let ordering = RegionOrdering::ranked(&sequences).unwrap();
        assert_eq!(ordering.key(&region("chrUn:0-10")), None);
        assert!(ordering.key_or_fallback(&region("chrUn:0-10")) > ordering.key_or_fallback(&region("chr1:900-910")));
    }

    #[test]
    fn test_ranked_requires_ordering() {
        let unranked = SequenceDictionary::from_records(vec![
            rangejoin_core::models::SequenceRecord::new("chr1", 10, None),
        ])
        .unwrap();
        assert_eq!(
            RegionOrdering::ranked(&unranked),
            Err(PartitionError::MissingContigOrdering)
        );
        assert_eq!(
            RegionOrdering::for_dictionary(&unranked).strategy(),
            SortStrategy::Lexicographic
        );
    }
}
