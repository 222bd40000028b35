use std::ffi::OsStr;
use std::fs::read_to_string;
use std::path::Path;

use rangejoin_core::models::ValidationStringency;
use rangejoin_overlaprs::OverlapperType;
use rangejoin_partition::SortStrategy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JoinConfigError {
    #[error("Missing or invalid file extension in join config file. It must be `toml`")]
    InvalidFileType,
    #[error("Thread count must be greater than zero")]
    InvalidThreadCount,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type JoinConfigResult<T> = std::result::Result<T, JoinConfigError>;

///
/// Settings shared by every join.
///
/// ```toml
/// flank_size = 500
/// partitions = 64
/// stringency = "strict"
/// sort_strategy = "lexicographic"
/// overlapper = "ailist"
/// threads = 8
/// ```
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    /// Symmetric padding applied to left intervals before matching.
    pub flank_size: u64,
    /// Partition count used when the shuffle join has to sort.
    pub partitions: Option<usize>,
    pub stringency: ValidationStringency,
    pub sort_strategy: SortStrategy,
    /// Index used by the broadcast join.
    pub overlapper: OverlapperType,
    /// Run joins in a dedicated pool of this many threads.
    pub threads: Option<usize>,
}

impl Default for JoinConfig {
    fn default() -> Self {
        JoinConfig {
            flank_size: 0,
            partitions: None,
            stringency: ValidationStringency::Lenient,
            sort_strategy: SortStrategy::Ranked,
            overlapper: OverlapperType::IntervalArray,
            threads: None,
        }
    }
}

impl JoinConfig {
    pub fn from_path(path: &Path) -> JoinConfigResult<Self> {
        match path.extension().and_then(OsStr::to_str) {
            Some("toml") => {
                let toml_str = read_to_string(path)?;
                Self::from_toml_str(&toml_str)
            }
            _ => Err(JoinConfigError::InvalidFileType),
        }
    }

    pub fn from_toml_str(toml_str: &str) -> JoinConfigResult<Self> {
        let config: JoinConfig = toml::from_str(toml_str)?;
        if config.threads == Some(0) {
            return Err(JoinConfigError::InvalidThreadCount);
        }
        Ok(config)
    }

    pub fn with_flank_size(mut self, flank_size: u64) -> Self {
        self.flank_size = flank_size;
        self
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = Some(partitions);
        self
    }

    pub fn with_stringency(mut self, stringency: ValidationStringency) -> Self {
        self.stringency = stringency;
        self
    }

    pub fn with_overlapper(mut self, overlapper: OverlapperType) -> Self {
        self.overlapper = overlapper;
        self
    }

    ///
    /// Run `op` on a dedicated pool of `threads` workers, or on the global
    /// pool when no thread count is set.
    ///
    pub fn install<R, OP>(&self, op: OP) -> JoinConfigResult<R>
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match self.threads {
            Some(0) => Err(JoinConfigError::InvalidThreadCount),
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?;
                Ok(pool.install(op))
            }
            None => Ok(op()),
        }
    }
}

impl TryFrom<&Path> for JoinConfig {
    type Error = JoinConfigError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        JoinConfig::from_path(path)
    }
}
