use std::fmt::Display;

use log::warn;

/// How to react to records that cannot be placed (unmapped, unranked contig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ValidationStringency {
    /// Fail on the first offending record.
    Strict,
    /// Log a warning and drop the record.
    #[default]
    Lenient,
    /// Drop the record without logging.
    Silent,
}

impl ValidationStringency {
    ///
    /// Apply this policy to a validation failure.
    ///
    /// Returns `Err(error)` under [`Strict`](Self::Strict); otherwise the
    /// caller should drop the offending record.
    ///
    pub fn check<E: Display>(self, error: E) -> Result<(), E> {
        match self {
            ValidationStringency::Strict => Err(error),
            ValidationStringency::Lenient => {
                warn!("Dropping record: {error}");
                Ok(())
            }
            ValidationStringency::Silent => Ok(()),
        }
    }
}
