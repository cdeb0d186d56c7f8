use rand::seq::index;
use rand::Rng;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Labels for the positional quality bins, ordered from the read end
/// they are counted from.
pub const BIN_LABELS: [&str; 18] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11-20", "21-50", "51-100", "101-200",
    "201-300", "301-1000", "1001-10000", ">10000",
];

/// Zero-based start offset of each positional bin; strictly increasing,
/// the last bin extends to the end of the read.
pub const BIN_STARTS: [usize; 18] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 20, 50, 100, 200, 300, 1000, 10000,
];

/// Sanger Phred+33 quality encoding offset.
const PHRED_OFFSET: u8 = 33;

/// A collection of custom errors for the per-read statistics.
///
/// Zero-length reads and all-N sequences would otherwise surface as a
/// division by zero; fabricating a statistic instead would corrupt the
/// report, so these propagate to the caller.
#[derive(Error, Debug, PartialEq)]
pub enum StatsError {
    /// Indicates a read with an empty sequence.
    #[error("cannot compute statistics for a zero-length read")]
    EmptyRead,

    /// Indicates a sequence with no countable bases (e.g. all N).
    #[error("cannot compute GC content of a sequence without countable bases")]
    NoCountableBases,
}

/// Compute the GC content of a nucleotide sequence.
///
/// Counting is case-insensitive: `G`, `C` and the IUPAC ambiguity code
/// `S` (G or C) count toward the GC total, `N` is excluded from both
/// the numerator and the denominator, and every other character counts
/// toward the denominator only.
///
/// Returns a fraction in [0, 1] if `as_decimal` is true, otherwise a
/// percentage in [0, 100].
///
/// # Errors
///
/// Returns [`StatsError::NoCountableBases`] when no character of the
/// sequence is countable.
///
/// # Example
///
/// ```compile
/// let gc = gc_content(b"GCAT", true)?;
/// assert_eq!(gc, 0.5);
/// ```
pub fn gc_content(seq: &[u8], as_decimal: bool) -> Result<f64, StatsError> {
    let mut gc: u64 = 0;
    let mut excluded: u64 = 0;
    for base in seq.iter() {
        match base.to_ascii_uppercase() {
            b'G' | b'C' | b'S' => gc += 1,
            b'N' => excluded += 1,
            _ => {}
        }
    }
    let counted = seq.len() as u64 - excluded;
    if counted == 0 {
        return Err(StatsError::NoCountableBases);
    }
    let fraction = gc as f64 / counted as f64;
    match as_decimal {
        true => Ok(fraction),
        false => Ok(fraction * 100.0),
    }
}

/// Pooled quality scores per positional bin.
///
/// Bins are stored in schedule order as growable vectors; reads shorter
/// than a bin's start offset simply contribute nothing to it. Per-read
/// identity is lost by design, the bins are pooled distributions.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityBins {
    bins: Vec<Vec<f64>>,
}

impl QualityBins {
    pub fn new() -> Self {
        QualityBins {
            bins: vec![Vec::new(); BIN_LABELS.len()],
        }
    }
    /// Assign the quality scores of one read to the positional bins.
    ///
    /// Each bin covers the half-open offset range from its start to the
    /// next bin's start; the last bin runs to the end of the read. Pass
    /// the quality bytes reversed to bin from the 3' end instead: the
    /// schedule applied to the reversed array is exactly the from-end
    /// binning (bin "1" from the end is the last base of the read).
    pub fn fill(&mut self, qual: &[u8]) {
        for (i, &start) in BIN_STARTS.iter().enumerate() {
            if start >= qual.len() {
                // offsets are strictly increasing, later bins are empty too
                break;
            }
            let end = match BIN_STARTS.get(i + 1) {
                Some(&next) => next.min(qual.len()),
                None => qual.len(),
            };
            self.bins[i].extend(qual[start..end].iter().map(|&q| (q - PHRED_OFFSET) as f64));
        }
    }
    /// Get the pooled scores for a bin label.
    pub fn get(&self, label: &str) -> Option<&[f64]> {
        let i = BIN_LABELS.iter().position(|&name| name == label)?;
        Some(&self.bins[i])
    }
    /// Total number of scores pooled over all bins.
    pub fn total_scores(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }
    /// Downsample every bin independently to at most `max` scores.
    pub fn downsample<R: Rng>(&mut self, max: usize, rng: &mut R) {
        for bin in self.bins.iter_mut() {
            downsample(bin, max, rng);
        }
    }
}

impl Default for QualityBins {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for QualityBins {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.bins.len()))?;
        for (label, scores) in BIN_LABELS.iter().zip(self.bins.iter()) {
            map.serialize_entry(label, scores)?;
        }
        map.end()
    }
}

/// Accumulated per-read statistics for a fastq file.
///
/// The three scalar vectors are index-aligned in read order until
/// downsampled; the bin collections pool scores over all reads.
#[derive(Debug, Serialize)]
pub struct FastqData {
    pub gc_content: Vec<f64>,
    pub read_lengths: Vec<u64>,
    pub mean_quality: Vec<f64>,
    pub bins_from_start: QualityBins,
    pub bins_from_end: QualityBins,
}

impl FastqData {
    pub fn new() -> Self {
        FastqData {
            gc_content: Vec::new(),
            read_lengths: Vec::new(),
            mean_quality: Vec::new(),
            bins_from_start: QualityBins::new(),
            bins_from_end: QualityBins::new(),
        }
    }
    /// Fold one read into the accumulated statistics.
    ///
    /// `seq` and `qual` are the raw sequence and Phred+33 quality bytes
    /// of the record and must have the same length; mismatched lengths
    /// are a caller error and are not defended against here.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::EmptyRead`] for a zero-length read and
    /// [`StatsError::NoCountableBases`] for an all-N sequence.
    ///
    /// # Example
    ///
    /// ```compile
    /// let mut data = FastqData::new();
    /// data.push_read(b"ACGT", b"IIII")?;
    /// ```
    pub fn push_read(&mut self, seq: &[u8], qual: &[u8]) -> Result<(), StatsError> {
        let length = seq.len();
        if length == 0 {
            return Err(StatsError::EmptyRead);
        }
        self.gc_content.push(gc_content(seq, false)?);
        self.read_lengths.push(length as u64);

        let phred_sum: u64 = qual.iter().map(|&q| (q - PHRED_OFFSET) as u64).sum();
        self.mean_quality.push(phred_sum as f64 / length as f64);

        self.bins_from_start.fill(qual);
        let reversed: Vec<u8> = qual.iter().rev().copied().collect();
        self.bins_from_end.fill(&reversed);

        Ok(())
    }
    /// Get the number of reads
    pub fn reads(&self) -> u64 {
        self.read_lengths.len() as u64
    }
    /// Get the total number of bases
    pub fn bases(&self) -> u64 {
        self.read_lengths.iter().sum()
    }
    /// Get the mean read length
    pub fn mean_length(&self) -> f64 {
        self.bases() as f64 / self.reads() as f64
    }
    /// Get the mean of the per-read mean qualities
    pub fn mean_read_quality(&self) -> f64 {
        self.mean_quality.iter().sum::<f64>() / self.mean_quality.len() as f64
    }
    /// Get the mean GC content percentage
    pub fn mean_gc(&self) -> f64 {
        self.gc_content.iter().sum::<f64>() / self.gc_content.len() as f64
    }
    /// Downsample every collection independently to at most `max` values.
    ///
    /// Each collection (and each individual bin) gets a fresh random
    /// draw, so the scalar vectors are no longer index-aligned with
    /// each other afterwards. This is a known limitation of independent
    /// sampling; see [`FastqData::downsample_correlated`] for the
    /// alternative that keeps the scalars aligned.
    pub fn downsample<R: Rng>(&mut self, max: usize, rng: &mut R) {
        downsample(&mut self.gc_content, max, rng);
        downsample(&mut self.read_lengths, max, rng);
        downsample(&mut self.mean_quality, max, rng);
        self.bins_from_start.downsample(max, rng);
        self.bins_from_end.downsample(max, rng);
    }
    /// Downsample with a single index draw shared by the three scalar
    /// collections, preserving their per-read alignment.
    ///
    /// The bin collections have no per-read identity to preserve and
    /// are still sampled independently.
    pub fn downsample_correlated<R: Rng>(&mut self, max: usize, rng: &mut R) {
        if max > 0 && self.read_lengths.len() > max {
            let picked: Vec<usize> = index::sample(rng, self.read_lengths.len(), max).into_vec();
            self.gc_content = picked.iter().map(|&i| self.gc_content[i]).collect();
            self.read_lengths = picked.iter().map(|&i| self.read_lengths[i]).collect();
            self.mean_quality = picked.iter().map(|&i| self.mean_quality[i]).collect();
        }
        self.bins_from_start.downsample(max, rng);
        self.bins_from_end.downsample(max, rng);
    }
}

impl Default for FastqData {
    fn default() -> Self {
        Self::new()
    }
}

/// Downsample a collection to at most `max` values by uniform random
/// sampling without replacement; `max == 0` disables downsampling.
pub fn downsample<T: Copy, R: Rng>(values: &mut Vec<T>, max: usize, rng: &mut R) {
    if max == 0 || values.len() <= max {
        return;
    }
    let picked = index::sample(rng, values.len(), max);
    *values = picked.iter().map(|i| values[i]).collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn gc_content_all_gc() {
        assert_float_eq!(gc_content(b"cgCG", true).unwrap(), 1.0, abs <= 1e-9);
    }

    #[test]
    fn gc_content_no_gc() {
        assert_float_eq!(gc_content(b"tTaA", true).unwrap(), 0.0, abs <= 1e-9);
    }

    #[test]
    fn gc_content_half_gc() {
        assert_float_eq!(gc_content(b"GCAT", true).unwrap(), 0.5, abs <= 1e-9);
    }

    #[test]
    fn gc_content_excludes_n_from_denominator() {
        assert_float_eq!(gc_content(b"GCATNN", true).unwrap(), 0.5, abs <= 1e-9);
    }

    #[test]
    fn gc_content_counts_s_as_gc() {
        assert_float_eq!(gc_content(b"GCATNNS", true).unwrap(), 0.6, abs <= 1e-9);
    }

    #[test]
    fn gc_content_other_ambiguity_codes_count_as_at() {
        assert_float_eq!(gc_content(b"GCATNNSK", true).unwrap(), 0.5, abs <= 1e-9);
    }

    #[test]
    fn gc_content_percentage_scaling() {
        assert_float_eq!(gc_content(b"GCAT", false).unwrap(), 50.0, abs <= 1e-9);
    }

    #[test]
    fn gc_content_all_n_fails() {
        assert_eq!(
            gc_content(b"NNNN", true).unwrap_err(),
            StatsError::NoCountableBases
        );
    }

    #[test]
    fn bin_schedule_is_strictly_increasing() {
        assert_eq!(BIN_STARTS.len(), BIN_LABELS.len());
        for pair in BIN_STARTS.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn bins_assign_half_open_ranges() {
        // 25 bases of known quality: Phred value equals the offset
        let qual: Vec<u8> = (0u8..25).map(|q| q + 33).collect();
        let mut bins = QualityBins::new();
        bins.fill(&qual);

        assert_eq!(bins.get("1").unwrap(), &[0.0]);
        assert_eq!(bins.get("10").unwrap(), &[9.0]);
        let expected_11_20: Vec<f64> = (10..20).map(|q| q as f64).collect();
        assert_eq!(bins.get("11-20").unwrap(), expected_11_20.as_slice());
        let expected_21_50: Vec<f64> = (20..25).map(|q| q as f64).collect();
        assert_eq!(bins.get("21-50").unwrap(), expected_21_50.as_slice());
        assert_eq!(bins.get("51-100").unwrap(), &[] as &[f64]);
    }

    #[test]
    fn short_read_skips_later_bins() {
        let mut bins = QualityBins::new();
        bins.fill(b"II");
        assert_eq!(bins.get("1").unwrap(), &[40.0]);
        assert_eq!(bins.get("2").unwrap(), &[40.0]);
        assert_eq!(bins.get("3").unwrap(), &[] as &[f64]);
        assert_eq!(bins.total_scores(), 2);
    }

    #[test]
    fn open_ended_last_bin_takes_the_tail() {
        let qual = vec![b'I'; 10050];
        let mut bins = QualityBins::new();
        bins.fill(&qual);
        assert_eq!(bins.get(">10000").unwrap().len(), 50);
        assert_eq!(bins.total_scores(), 10050);
    }

    #[test]
    fn every_base_is_binned_once_per_direction() {
        let mut data = FastqData::new();
        for length in [1usize, 7, 42, 333, 1500, 20000].iter() {
            let seq = vec![b'A'; *length];
            let qual = vec![b'5'; *length];
            data.push_read(&seq, &qual).unwrap();
        }
        let total_bases = data.bases() as usize;
        assert_eq!(data.bins_from_start.total_scores(), total_bases);
        assert_eq!(data.bins_from_end.total_scores(), total_bases);
    }

    #[test]
    fn from_end_equals_schedule_on_reversed_qualities() {
        let qual: Vec<u8> = (0..137u32).map(|i| 33 + (i % 40) as u8).collect();
        let seq = vec![b'A'; qual.len()];

        let mut data = FastqData::new();
        data.push_read(&seq, &qual).unwrap();

        let reversed: Vec<u8> = qual.iter().rev().copied().collect();
        let mut expected = QualityBins::new();
        expected.fill(&reversed);

        assert_eq!(data.bins_from_end, expected);
        // and bin "1" from the end is the last base of the read
        let last = (qual[qual.len() - 1] - 33) as f64;
        assert_eq!(data.bins_from_end.get("1").unwrap(), &[last]);
    }

    #[test]
    fn push_read_accumulates_scalars_in_order() {
        let mut data = FastqData::new();
        data.push_read(b"GCGC", b"IIII").unwrap();
        data.push_read(b"ATAT", b"!!!!").unwrap();

        assert_eq!(data.read_lengths, vec![4, 4]);
        assert_float_eq!(data.gc_content[0], 100.0, abs <= 1e-9);
        assert_float_eq!(data.gc_content[1], 0.0, abs <= 1e-9);
        assert_float_eq!(data.mean_quality[0], 40.0, abs <= 1e-9);
        assert_float_eq!(data.mean_quality[1], 0.0, abs <= 1e-9);
        assert_eq!(data.reads(), 2);
        assert_eq!(data.bases(), 8);
        assert_float_eq!(data.mean_length(), 4.0, abs <= 1e-9);
        assert_float_eq!(data.mean_read_quality(), 20.0, abs <= 1e-9);
        assert_float_eq!(data.mean_gc(), 50.0, abs <= 1e-9);
    }

    #[test]
    fn empty_read_fails() {
        let mut data = FastqData::new();
        assert_eq!(data.push_read(b"", b"").unwrap_err(), StatsError::EmptyRead);
    }

    #[test]
    fn downsample_zero_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut values: Vec<u64> = (0..100).collect();
        let original = values.clone();
        downsample(&mut values, 0, &mut rng);
        assert_eq!(values, original);
    }

    #[test]
    fn downsample_small_collection_unchanged() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut values: Vec<u64> = (0..10).collect();
        let original = values.clone();
        downsample(&mut values, 10, &mut rng);
        assert_eq!(values, original);
    }

    #[test]
    fn downsample_picks_original_values_without_replacement() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut values: Vec<u64> = (0..1000).collect();
        downsample(&mut values, 50, &mut rng);
        assert_eq!(values.len(), 50);
        let mut seen = values.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 50);
        assert!(values.iter().all(|v| *v < 1000));
    }

    #[test]
    fn downsample_applies_to_every_collection() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut data = FastqData::new();
        for _ in 0..20 {
            data.push_read(b"ACGTACGT", b"IIIIIIII").unwrap();
        }
        data.downsample(5, &mut rng);
        assert_eq!(data.gc_content.len(), 5);
        assert_eq!(data.read_lengths.len(), 5);
        assert_eq!(data.mean_quality.len(), 5);
        for label in BIN_LABELS.iter() {
            assert!(data.bins_from_start.get(label).unwrap().len() <= 5);
            assert!(data.bins_from_end.get(label).unwrap().len() <= 5);
        }
    }

    #[test]
    fn correlated_downsample_keeps_scalars_aligned() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut data = FastqData::new();
        for i in 1..=50u64 {
            // length i, all-G read: gc = 100, mean quality 40
            let seq = vec![b'G'; i as usize];
            let qual = vec![b'I'; i as usize];
            data.push_read(&seq, &qual).unwrap();
            // tag the mean quality with the read index to check pairing
            *data.mean_quality.last_mut().unwrap() += i as f64;
        }
        data.downsample_correlated(10, &mut rng);
        assert_eq!(data.read_lengths.len(), 10);
        for (length, quality) in data.read_lengths.iter().zip(data.mean_quality.iter()) {
            assert_float_eq!(*quality, 40.0 + *length as f64, abs <= 1e-9);
        }
    }

    #[test]
    fn bins_serialize_as_ordered_label_map() {
        let mut bins = QualityBins::new();
        bins.fill(b"III");
        let json = serde_json::to_string(&bins).unwrap();
        assert!(json.starts_with("{\"1\":[40.0]"));
        assert!(json.contains("\">10000\":[]"));
    }
}
