//! The `scan` subcommand: reads a dataset matrix, label vector and
//! stratum-size file from disk, runs the two-pass engine, and writes the
//! significant-intervals CSV, the optional testable-P-values CSV, the
//! summary text and the psi-histogram (spec.md §6).

use crate::{input, reporting};
use crate::{GlobalConfiguration, Subcommand};
use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use sigscan::dataset::Dataset;
use sigscan::kernels::chisq::chi_square_sf;
use sigscan::sink::CallbackSink;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

/// Scan a stratified binary sequence dataset for significant contiguous
/// intervals, controlling the family-wise error rate across the whole
/// interval lattice.
#[derive(Parser)]
pub struct Opts {
    /// Path to the sequence matrix file: `L` lines of `N` '0'/'1' characters.
    #[arg(value_hint = ValueHint::FilePath)]
    x_file: PathBuf,
    /// Path to the label file: a stream of `N` '0'/'1' characters, ordered
    /// by stratum.
    #[arg(value_hint = ValueHint::FilePath)]
    y_file: PathBuf,
    /// Path to the covariate file: one stratum size `Nt[k]` per line.
    #[arg(value_hint = ValueHint::FilePath)]
    c_file: PathBuf,
    /// Target family-wise error rate.
    alpha: f64,
    /// Maximum interval length to explore; `0` means unlimited.
    l_max: usize,
    /// Prefix for the output files: `<prefix>_sigints.csv`,
    /// `<prefix>_summary.txt`, `<prefix>_maxfish_hist.txt`.
    #[arg(value_hint = ValueHint::AnyPath)]
    output_prefix: PathBuf,
    /// Also write every testable interval's P-value to this file.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::AnyPath)]
    pval_file: Option<PathBuf>,
}

impl Subcommand for Opts {
    fn run(&self, _cfg: &GlobalConfiguration) -> Result<ExitCode> {
        let seq_len = input::count_lines(&self.x_file)?;
        let stratum_sizes = input::read_stratum_sizes(&self.c_file)?;
        let n_obs: usize = stratum_sizes.iter().sum();

        let x = input::read_sequence_matrix(&self.x_file, seq_len, n_obs)?;
        let y = input::read_labels(&self.y_file, n_obs)?;
        let dataset = Dataset::new(x, y, &stratum_sizes).context("invalid dataset")?;

        info!(n = dataset.n_obs, l = dataset.seq_len, k = dataset.n_strata(), "dataset loaded");

        let prefix = self.output_prefix.display().to_string();
        let sigints_path = PathBuf::from(format!("{prefix}_sigints.csv"));
        let summary_path = PathBuf::from(format!("{prefix}_summary.txt"));
        let histogram_path = PathBuf::from(format!("{prefix}_maxfish_hist.txt"));

        let mut sigints_writer = reporting::csv_writer(&sigints_path)?;
        let mut pval_writer = self.pval_file.as_deref().map(reporting::csv_writer).transpose()?;
        let mut histogram_writer = reporting::histogram_writer(&histogram_path)?;

        let summary = {
            let mut sink = CallbackSink::new(
                |l, tau, p| {
                    if let Some(writer) = pval_writer.as_mut() {
                        let _ = reporting::write_record(writer, l, tau, p);
                    }
                },
                |l, tau, p| {
                    let _ = reporting::write_record(&mut sigints_writer, l, tau, p);
                },
                |bucket, count| {
                    let _ = reporting::write_histogram_bucket(&mut histogram_writer, bucket, count);
                },
            );

            sigscan::driver::run(
                &dataset,
                self.alpha,
                chi_square_sf,
                self.l_max,
                &mut sink,
                self.pval_file.is_some(),
            )
        };

        sigints_writer.flush().context("unable to flush significant-intervals CSV")?;
        if let Some(writer) = pval_writer.as_mut() {
            writer.flush().context("unable to flush P-value CSV")?;
        }
        histogram_writer.flush().context("unable to flush histogram file")?;

        match summary.delta_star {
            Some(delta) => info!(m = summary.m, delta_star = delta, "corrected threshold computed"),
            None => info!("no testable intervals; delta_star is undefined"),
        }

        reporting::write_summary(&summary_path, &summary)?;

        Ok(ExitCode::SUCCESS)
    }
}
