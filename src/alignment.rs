use rust_htslib::bam::record::{Aux, Cigar, Record};
use rust_htslib::bam::{self, Read};
use std::convert::TryFrom;
use std::path::Path;
use thiserror::Error;

/// A collection of custom errors relating to working with SAM/BAM files.
#[derive(Error, Debug)]
pub enum AlignmentError {
    /// Indicates that the alignment file could not be opened or read.
    #[error("failed to read alignment file")]
    Read {
        #[from]
        source: rust_htslib::errors::Error,
    },
}

/// Collect the percent identity of every primary mapped alignment.
///
/// Streams over the SAM/BAM records in a single pass, skipping
/// unmapped, secondary and supplementary alignments. Records for which
/// no identity can be derived (no usable tags, or a zero aligned
/// length) contribute no value; identity is best-effort per alignment.
///
/// # Errors
///
/// Open and parse errors from htslib are returned as
/// [`AlignmentError::Read`].
pub fn collect_percent_identity(path: &Path) -> Result<Vec<f64>, AlignmentError> {
    let mut reader = bam::Reader::from_path(path)?;
    let mut identities: Vec<f64> = Vec::new();
    for result in reader.records() {
        let record = result?;
        if !is_primary(&record) {
            continue;
        }
        if let Some(identity) = percent_identity(&record) {
            identities.push(identity);
        }
    }
    Ok(identities)
}

/// A primary alignment is mapped and neither secondary nor supplementary.
pub fn is_primary(record: &Record) -> bool {
    !record.is_unmapped() && !record.is_secondary() && !record.is_supplementary()
}

/// Derive the percent identity of an alignment record.
///
/// Identity is `100 * (1 - edits / aligned_length)` over the aligned
/// portion of the query. The edit count is taken from the `NM` tag
/// when present, otherwise reconstructed from the `MD` string and the
/// CIGAR insertions; with neither available the record has no identity.
/// A zero aligned length also yields `None`, matching the missing-tag
/// case rather than failing.
pub fn percent_identity(record: &Record) -> Option<f64> {
    let aligned_length = query_alignment_length(record);
    if aligned_length == 0 {
        return None;
    }
    let edits = edit_distance_tag(record).or_else(|| edits_from_md_cigar(record))?;
    Some(100.0 * (1.0 - edits as f64 / aligned_length as f64))
}

/// Number of query bases in the aligned portion of the read: the sum
/// of the query-consuming CIGAR operations, soft clips excluded.
fn query_alignment_length(record: &Record) -> u64 {
    record
        .cigar()
        .iter()
        .map(|op| match op {
            Cigar::Match(len) | Cigar::Ins(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                u64::from(*len)
            }
            _ => 0,
        })
        .sum()
}

/// Edit distance from the `NM` tag, if present with an integer value.
fn edit_distance_tag(record: &Record) -> Option<u64> {
    match record.aux(b"NM").ok()? {
        Aux::U8(nm) => Some(u64::from(nm)),
        Aux::U16(nm) => Some(u64::from(nm)),
        Aux::U32(nm) => Some(u64::from(nm)),
        Aux::I8(nm) => u64::try_from(nm).ok(),
        Aux::I16(nm) => u64::try_from(nm).ok(),
        Aux::I32(nm) => u64::try_from(nm).ok(),
        _ => None,
    }
}

/// Reconstruct an edit count equivalent to `NM` from the `MD` string
/// (mismatches and deleted reference bases) plus the CIGAR insertions.
fn edits_from_md_cigar(record: &Record) -> Option<u64> {
    let md = match record.aux(b"MD").ok()? {
        Aux::String(md) => md.to_owned(),
        _ => return None,
    };
    let insertions: u64 = record
        .cigar()
        .iter()
        .map(|op| match op {
            Cigar::Ins(len) => u64::from(*len),
            _ => 0,
        })
        .sum();
    Some(md_edit_count(&md) as u64 + insertions)
}

/// Count the mismatches and deleted bases encoded in an MD string.
///
/// Match runs are digit runs and deletions are introduced by `^`, so
/// every character that is neither a digit nor a caret is one
/// mismatched or deleted base.
pub fn md_edit_count(md: &str) -> usize {
    md.chars()
        .filter(|c| !c.is_ascii_digit() && *c != '^')
        .count()
}
