use needletail::{parse_fastx_file, parse_fastx_reader, FastxReader};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

use crate::stats::{FastqData, StatsError};

/// A collection of custom errors relating to working with fastx files.
#[derive(Error, Debug)]
pub enum FastxError {
    /// Indicates that the input file could not be opened for parsing.
    #[error("failed to open fastx input")]
    Open {
        source: needletail::errors::ParseError,
    },

    /// Indicates that a sequence record could not be parsed.
    #[error("failed to parse sequence record")]
    Parse {
        source: needletail::errors::ParseError,
    },

    /// Indicates a record without quality scores (fasta input).
    #[error("record {0} has no quality scores, fastq input is required")]
    MissingQuality(String),

    /// Indicates that a per-read statistic could not be computed.
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Fastx scanner
///
/// Minimal wrapper around the needletail reader that streams records
/// into the accumulated per-read statistics. Input decompression
/// (gz/bz2/xz) is handled transparently by needletail.
pub struct FastxScanner {
    reader: Box<dyn FastxReader>,
}

impl FastxScanner {
    /// Create a scanner over a fastq file, which may be compressed.
    pub fn from_path(path: &Path) -> Result<Self, FastxError> {
        let reader = parse_fastx_file(path).map_err(|source| FastxError::Open { source })?;
        Ok(FastxScanner { reader })
    }
    /// Create a scanner over an already-opened byte stream.
    pub fn from_reader<R: Read + Send + 'static>(handle: R) -> Result<Self, FastxError> {
        let reader = parse_fastx_reader(handle).map_err(|source| FastxError::Open { source })?;
        Ok(FastxScanner { reader })
    }
    /// Consume the record stream and aggregate the per-read statistics
    /// in a single forward pass.
    ///
    /// # Errors
    ///
    /// Parse errors from the underlying reader and statistic failures
    /// for malformed reads (zero-length or all-N sequences) propagate
    /// as variants of [`FastxError`]; nothing is skipped or defaulted.
    ///
    /// # Example
    ///
    /// ```compile
    /// let scanner = FastxScanner::from_path(&path)?;
    /// let data = scanner.scan()?;
    /// ```
    pub fn scan(mut self) -> Result<FastqData, FastxError> {
        let mut data = FastqData::new();
        while let Some(record) = self.reader.next() {
            match record {
                Ok(rec) => {
                    let qual = rec.qual().ok_or_else(|| {
                        FastxError::MissingQuality(String::from_utf8_lossy(rec.id()).into_owned())
                    })?;
                    let seq = rec.seq();
                    data.push_read(&seq, qual)?;
                }
                Err(source) => return Err(FastxError::Parse { source }),
            }
        }
        Ok(data)
    }
}
