use std::io::Write;

use rstest::*;
use tempfile::NamedTempFile;

use rangejoin::core::models::{ReferenceRegion, SequenceDictionary, ValidationStringency};
use rangejoin::core::utils::read_chrom_sizes;
use rangejoin::join::{JoinConfig, ShuffleRegionJoin};
use rangejoin::partition::GenomicDataset;

#[fixture]
fn sequences() -> SequenceDictionary {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "chr1\t5000\nchr2\t3000\nchrX\t4000").unwrap();
    read_chrom_sizes(file.path()).unwrap()
}

fn regions(spans: &[&str], sequences: &SequenceDictionary) -> GenomicDataset<ReferenceRegion> {
    GenomicDataset::from_vec(
        spans.iter().map(|s| s.parse().unwrap()).collect(),
        2,
        sequences.clone(),
        |r: &ReferenceRegion| vec![r.clone()],
    )
}

mod tests {
    use super::*;

    #[rstest]
    fn test_sort_then_join(sequences: SequenceDictionary) {
        assert_eq!(sequences.ordered_names(), vec!["chr1", "chr2", "chrX"]);

        let peaks = regions(&["chrX:10-20", "chr1:100-200", "chr2:0-50"], &sequences)
            .sort(Some(2), ValidationStringency::Strict)
            .unwrap();
        let first: Vec<String> = peaks
            .records()
            .iter()
            .map(|r| r.reference_name.clone())
            .collect();
        assert_eq!(first, vec!["chr1", "chr2", "chrX"]);

        let reads = regions(&["chr1:150-160", "chrX:0-5", "chr2:40-60"], &sequences);
        let joined = peaks
            .left_outer_shuffle_region_join(reads, &JoinConfig::default())
            .unwrap();
        let mut rows: Vec<(String, Option<String>)> = joined
            .records()
            .iter()
            .map(|(l, r)| (l.to_string(), r.as_ref().map(|r| r.to_string())))
            .collect();
        rows.sort();
        assert_eq!(
            rows,
            vec![
                ("chr1:100-200".to_string(), Some("chr1:150-160".to_string())),
                ("chr2:0-50".to_string(), Some("chr2:40-60".to_string())),
                ("chrX:10-20".to_string(), None),
            ]
        );
    }
}
