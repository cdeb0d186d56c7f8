use serde::Serialize;
use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use thiserror::Error;

use crate::cli::{Cli, CompressionExt, PlotKind};
use crate::stats::FastqData;

/// A collection of custom errors relating to writing the report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Indicates that the output file could not be created.
    #[error("failed to create report output file")]
    Create { source: std::io::Error },

    /// Indicates that the compressed output writer could not be built.
    #[error("failed to get compressed report writer")]
    Compress { source: niffler::Error },

    /// Indicates that the report could not be serialized.
    #[error("failed to serialize report")]
    Serialize { source: serde_json::Error },
}

/// Plot settings passed through to the downstream plotting step.
#[derive(Debug, Serialize)]
struct Settings {
    plot_kind: PlotKind,
    log_length: bool,
    downsample: usize,
    correlated: bool,
    seed: Option<u64>,
}

/// The aggregated collections handed to the plotting collaborator:
/// plain value arrays for GC content, read length, mean quality and
/// percent identity, ordered label maps for the positional bins.
#[derive(Debug, Serialize)]
struct Report<'a> {
    settings: Settings,
    #[serde(skip_serializing_if = "Option::is_none")]
    fastq: Option<&'a FastqData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    percent_identity: Option<&'a [f64]>,
}

/// Write the JSON report to the output file given on the command line,
/// or to stdout if none was given.
///
/// Output compression is inferred from the filename extension, the way
/// the input side infers decompression.
pub fn write_report(
    args: &Cli,
    fastq: Option<&FastqData>,
    percent_identity: Option<&[f64]>,
) -> Result<(), ReportError> {
    let report = Report {
        settings: Settings {
            plot_kind: args.kind,
            log_length: !args.no_log_length,
            downsample: args.downsample,
            correlated: args.correlated,
            seed: args.seed,
        },
        fastq,
        percent_identity,
    };

    let writer: Box<dyn Write> = match &args.output {
        None => Box::new(stdout()),
        Some(output) => {
            let file = File::create(output).map_err(|source| ReportError::Create { source })?;
            let handle = Box::new(BufWriter::new(file));
            niffler::get_writer(handle, niffler::Format::from_path(output), niffler::Level::Six)
                .map_err(|source| ReportError::Compress { source })?
        }
    };

    serde_json::to_writer(writer, &report).map_err(|source| ReportError::Serialize { source })
}
