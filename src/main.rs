use anyhow::{Context, Result};
use indoc::eprintdoc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use structopt::StructOpt;

mod alignment;
mod cli;
mod fastx;
mod report;
mod stats;

use crate::fastx::FastxScanner;

fn main() -> Result<()> {
    let args = cli::Cli::from_args();
    args.validate()?;

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let fastq_data = match &args.fastq {
        Some(path) => {
            let scanner = FastxScanner::from_path(path)
                .with_context(|| format!("failed to open fastq input {:?}", path))?;
            let mut data = scanner
                .scan()
                .with_context(|| format!("failed to aggregate reads from {:?}", path))?;

            eprintdoc! {"\n
                Skua Read Summary
                =================

                Number of reads:      {reads}
                Number of bases:      {bases}
                Mean read length:     {mean_length:.0}
                Mean read quality:    {mean_quality:.2}
                Mean GC content:      {mean_gc:.2}%
                ",
                reads = data.reads(),
                bases = data.bases(),
                mean_length = data.mean_length(),
                mean_quality = data.mean_read_quality(),
                mean_gc = data.mean_gc(),
            }

            if args.correlated {
                data.downsample_correlated(args.downsample, &mut rng);
            } else {
                data.downsample(args.downsample, &mut rng);
            }
            Some(data)
        }
        None => None,
    };

    let identities = match &args.bam {
        Some(path) => {
            let mut identities = alignment::collect_percent_identity(path)
                .with_context(|| format!("failed to extract percent identity from {:?}", path))?;

            let mean_identity = identities.iter().sum::<f64>() / identities.len().max(1) as f64;
            eprintdoc! {"\n
                Skua Alignment Summary
                ======================

                Primary alignments:   {alignments}
                Mean identity:        {mean_identity:.2}%
                ",
                alignments = identities.len(),
                mean_identity = mean_identity,
            }

            stats::downsample(&mut identities, args.downsample, &mut rng);
            Some(identities)
        }
        None => None,
    };

    report::write_report(&args, fastq_data.as_ref(), identities.as_deref())
        .context("failed to write report")?;

    Ok(())
}
