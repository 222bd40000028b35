use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;

use crate::models::{SequenceDictionary, SequenceRecord};

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

///
/// Read a `.chrom.sizes` style file (`name<whitespace>length` per line) into
/// a [`SequenceDictionary`]. Contigs are ranked in file order. Blank lines
/// and `#` comments are skipped.
///
pub fn read_chrom_sizes<T: AsRef<Path>>(path: T) -> Result<SequenceDictionary> {
    let reader = get_dynamic_reader(path.as_ref())?;
    let mut records = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let (Some(name), Some(length)) = (parts.next(), parts.next()) else {
            anyhow::bail!(
                "Chrom sizes line {} does not have a name and a length: {}",
                line_no + 1,
                line
            );
        };
        let length = length.parse::<u64>().with_context(|| {
            format!("Invalid contig length on chrom sizes line {}: {}", line_no + 1, line)
        })?;

        records.push(SequenceRecord::new(name, length, Some(records.len() as u32)));
    }

    Ok(SequenceDictionary::from_records(records)?)
}

impl TryFrom<&Path> for SequenceDictionary {
    type Error = anyhow::Error;

    fn try_from(value: &Path) -> Result<Self> {
        read_chrom_sizes(value)
    }
}
