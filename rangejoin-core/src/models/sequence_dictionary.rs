use fxhash::FxHashMap;

use crate::errors::RegionError;

/// One contig in a [`SequenceDictionary`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceRecord {
    pub name: String,
    pub length: u64,
    /// Position of this contig in the reference's canonical order, if known.
    pub index: Option<u32>,
}

impl SequenceRecord {
    pub fn new(name: impl Into<String>, length: u64, index: Option<u32>) -> Self {
        SequenceRecord {
            name: name.into(),
            length,
            index,
        }
    }
}

///
/// Ordered catalogue of the contigs a dataset refers to.
///
/// Records keep insertion order. A dictionary "has ordering" when every
/// record carries a rank, which is what ranked sorting needs.
///
#[derive(Debug, Clone, Default)]
pub struct SequenceDictionary {
    records: Vec<SequenceRecord>,
    by_name: FxHashMap<String, usize>,
}

impl PartialEq for SequenceDictionary {
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl Eq for SequenceDictionary {}

impl SequenceDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(
        records: impl IntoIterator<Item = SequenceRecord>,
    ) -> Result<Self, RegionError> {
        let mut dict = SequenceDictionary::new();
        for record in records {
            if dict.by_name.contains_key(&record.name) {
                return Err(RegionError::DuplicateSequence(record.name));
            }
            dict.by_name.insert(record.name.clone(), dict.records.len());
            dict.records.push(record);
        }
        Ok(dict)
    }

    /// Build a dictionary from `(name, length)` pairs, ranking contigs in the given order.
    pub fn from_lengths<S: Into<String>>(
        lengths: impl IntoIterator<Item = (S, u64)>,
    ) -> Result<Self, RegionError> {
        Self::from_records(
            lengths
                .into_iter()
                .enumerate()
                .map(|(i, (name, length))| SequenceRecord::new(name, length, Some(i as u32))),
        )
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SequenceRecord> {
        self.by_name.get(name).map(|&i| &self.records[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn length_of(&self, name: &str) -> Option<u64> {
        self.get(name).map(|r| r.length)
    }

    pub fn rank_of(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(|r| r.index)
    }

    pub fn has_ordering(&self) -> bool {
        !self.records.is_empty() && self.records.iter().all(|r| r.index.is_some())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SequenceRecord> {
        self.records.iter()
    }

    /// Contig names in canonical order: by rank when the dictionary is fully
    /// ranked, otherwise lexicographically.
    pub fn ordered_names(&self) -> Vec<String> {
        let mut records: Vec<&SequenceRecord> = self.records.iter().collect();
        if self.has_ordering() {
            records.sort_by_key(|r| r.index);
        } else {
            records.sort_by(|a, b| a.name.cmp(&b.name));
        }
        records.into_iter().map(|r| r.name.clone()).collect()
    }

    pub fn lengths(&self) -> Vec<(String, u64)> {
        self.records
            .iter()
            .map(|r| (r.name.clone(), r.length))
            .collect()
    }

    ///
    /// Merge two dictionaries.
    ///
    /// For contigs in both, lengths must agree and this dictionary's rank is
    /// kept. Contigs only in `other` are appended in `other`'s rank order.
    /// A contig ranked in `other` but not here is ranked after every
    /// existing rank, so the result never holds the same rank twice.
    ///
    pub fn merge(&self, other: &SequenceDictionary) -> Result<SequenceDictionary, RegionError> {
        let mut merged = self.clone();
        let mut next_rank = self
            .records
            .iter()
            .filter_map(|r| r.index)
            .max()
            .map_or(0, |r| r + 1);
        let mut incoming: Vec<&SequenceRecord> = other.iter().collect();
        incoming.sort_by_key(|r| (r.index.is_none(), r.index));

        for record in incoming {
            let rank = record.index.map(|_| next_rank);
            match merged.by_name.get(&record.name) {
                Some(&i) => {
                    let existing = &mut merged.records[i];
                    if existing.length != record.length {
                        return Err(RegionError::IncompatibleSequence {
                            name: record.name.clone(),
                            left: existing.length,
                            right: record.length,
                        });
                    }
                    if existing.index.is_none() && rank.is_some() {
                        existing.index = rank;
                        next_rank += 1;
                    }
                }
                None => {
                    merged.by_name.insert(record.name.clone(), merged.records.len());
                    merged
                        .records
                        .push(SequenceRecord::new(record.name.clone(), record.length, rank));
                    if rank.is_some() {
                        next_rank += 1;
                    }
                }
            }
        }
        Ok(merged)
    }
}

impl<'a> IntoIterator for &'a SequenceDictionary {
    type Item = &'a SequenceRecord;
    type IntoIter = std::slice::Iter<'a, SequenceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_lengths_assigns_ranks() {
        let dict = SequenceDictionary::from_lengths(vec![("chr2", 100), ("chr1", 200)]).unwrap();
        assert!(dict.has_ordering());
        assert_eq!(dict.rank_of("chr2"), Some(0));
        assert_eq!(dict.rank_of("chr1"), Some(1));
        assert_eq!(dict.length_of("chr1"), Some(200));
        assert_eq!(dict.ordered_names(), vec!["chr2", "chr1"]);
    }

    #[test]
    fn test_unranked_dictionary() {
        let dict = SequenceDictionary::from_records(vec![
            SequenceRecord::new("chrB", 10, None),
            SequenceRecord::new("chrA", 10, Some(0)),
        ])
        .unwrap();
        assert!(!dict.has_ordering());
        assert!(!SequenceDictionary::new().has_ordering());
        assert_eq!(dict.ordered_names(), vec!["chrA", "chrB"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = SequenceDictionary::from_lengths(vec![("chr1", 1), ("chr1", 1)]);
        assert_eq!(err, Err(RegionError::DuplicateSequence("chr1".to_string())));
    }

    #[test]
    fn test_merge() {
        let a = SequenceDictionary::from_lengths(vec![("chr1", 100), ("chr2", 50)]).unwrap();
        let b = SequenceDictionary::from_records(vec![
            SequenceRecord::new("chr2", 50, Some(7)),
            SequenceRecord::new("chr3", 25, Some(8)),
        ])
        .unwrap();

        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.rank_of("chr1"), Some(0));
        assert_eq!(merged.rank_of("chr2"), Some(1));
        assert_eq!(merged.rank_of("chr3"), Some(2));
        assert_eq!(merged.length_of("chr3"), Some(25));
    }

    #[test]
    fn test_merge_renumbers_overlapping_ranks() {
        let a = SequenceDictionary::from_lengths(vec![("chr1", 100)]).unwrap();
        let b = SequenceDictionary::from_lengths(vec![("chr3", 30), ("chr2", 20)]).unwrap();

        let merged = a.merge(&b).unwrap();
        assert!(merged.has_ordering());
        assert_eq!(merged.rank_of("chr1"), Some(0));
        assert_eq!(merged.rank_of("chr3"), Some(1));
        assert_eq!(merged.rank_of("chr2"), Some(2));
        assert_eq!(merged.ordered_names(), vec!["chr1", "chr3", "chr2"]);
    }

    #[test]
    fn test_merge_ranks_contigs_only_ranked_elsewhere() {
        let a = SequenceDictionary::from_records(vec![
            SequenceRecord::new("chrA", 10, Some(4)),
            SequenceRecord::new("chrB", 10, None),
        ])
        .unwrap();
        let b = SequenceDictionary::from_lengths(vec![("chrB", 10), ("chrC", 5)]).unwrap();

        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.rank_of("chrA"), Some(4));
        assert_eq!(merged.rank_of("chrB"), Some(5));
        assert_eq!(merged.rank_of("chrC"), Some(6));
        assert!(merged.has_ordering());
    }

    #[test]
    fn test_merge_conflicting_lengths() {
        let a = SequenceDictionary::from_lengths(vec![("chr1", 100)]).unwrap();
        let b = SequenceDictionary::from_lengths(vec![("chr1", 99)]).unwrap();
        assert!(matches!(
            a.merge(&b),
            Err(RegionError::IncompatibleSequence { .. })
        ));
    }
}
