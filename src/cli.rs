use serde::Serialize;
use std::path::PathBuf;
use structopt::StructOpt;
use thiserror::Error;

/// Quality control report data for long-read sequencing runs
#[derive(Debug, StructOpt)]
#[structopt()]
pub struct Cli {
    /// Fastq input file, may be gz/bz2/xz compressed.
    #[structopt(short, long, parse(from_os_str))]
    pub fastq: Option<PathBuf>,

    /// SAM/BAM input file for read percent identity.
    #[structopt(short, long, parse(from_os_str))]
    pub bam: Option<PathBuf>,

    /// Report output filepath, stdout if not present.
    ///
    /// A .gz/.bz2/.xz extension compresses the report accordingly.
    #[structopt(short, long, parse(from_os_str))]
    pub output: Option<PathBuf>,

    /// Representation for the quality vs read length plot.
    #[structopt(
        short,
        long,
        value_name = "scatter|kde|hex",
        default_value = "scatter",
        parse(try_from_str = parse_plot_kind),
        possible_values = &["scatter", "kde", "hex"],
        case_insensitive = true,
        hide_possible_values = true
    )]
    pub kind: PlotKind,

    /// Plot read lengths without log10 transformation.
    #[structopt(short = "n", long)]
    pub no_log_length: bool,

    /// Downsample each collection to at most INT values, 0 disables.
    #[structopt(short, long, value_name = "INT", default_value = "50000")]
    pub downsample: usize,

    /// Keep GC content, length and quality index-aligned when downsampling.
    #[structopt(short, long)]
    pub correlated: bool,

    /// Seed for the downsampling draws, random if not present.
    #[structopt(short, long, value_name = "INT")]
    pub seed: Option<u64>,
}

impl Cli {
    /// Check that the input arguments can be worked with.
    ///
    /// At least one of the fastq and alignment inputs must be given,
    /// and any given input path must exist.
    pub fn validate(&self) -> Result<(), CliError> {
        if self.fastq.is_none() && self.bam.is_none() {
            return Err(CliError::MissingInput);
        }
        for path in [&self.fastq, &self.bam].iter().filter_map(|p| p.as_ref()) {
            if !path.exists() {
                return Err(CliError::InputNotFound(path.clone()));
            }
        }
        Ok(())
    }
}

/// Interior representation of the quality vs read length plot,
/// recorded in the report for the downstream plotting step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    Scatter,
    Kde,
    Hex,
}

/// A collection of custom errors relating to the command line interface
/// for this package.
#[derive(Error, Debug, PartialEq)]
pub enum CliError {
    /// Indicates that a string cannot be parsed into a [`PlotKind`](#plotkind).
    #[error("{0} is not a valid plot kind")]
    InvalidPlotKind(String),

    /// Indicates that no input file was given.
    #[error("either --fastq, --bam or both must be given as arguments")]
    MissingInput,

    /// Indicates that a given input file does not exist.
    #[error("No such file: {0:?}")]
    InputNotFound(PathBuf),
}

// Niffler output compression adopted from Michael B. Hall - Rasusa (https://github.com/mbhall88/rasusa)

/// A trait used to implement the extension of inferring the compression
/// format from a file path.
pub trait CompressionExt {
    fn from_path<S: AsRef<std::ffi::OsStr> + ?Sized>(p: &S) -> Self;
}

impl CompressionExt for niffler::compression::Format {
    /// Attempts to infer the compression type from the file extension.
    /// If the extension is not known, then Uncompressed is returned.
    fn from_path<S: AsRef<std::ffi::OsStr> + ?Sized>(p: &S) -> Self {
        let path = std::path::Path::new(p);
        match path.extension().map(|s| s.to_str()) {
            Some(Some("gz")) => Self::Gzip,
            Some(Some("bz") | Some("bz2")) => Self::Bzip,
            Some(Some("lzma") | Some("xz")) => Self::Lzma,
            _ => Self::No,
        }
    }
}

/// Utility function to parse the plot kind
fn parse_plot_kind(s: &str) -> Result<PlotKind, CliError> {
    match s.to_ascii_lowercase().as_str() {
        "scatter" => Ok(PlotKind::Scatter),
        "kde" => Ok(PlotKind::Kde),
        "hex" => Ok(PlotKind::Hex),
        _ => Err(CliError::InvalidPlotKind(s.to_string())),
    }
}
