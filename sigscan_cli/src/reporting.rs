//! Output writers: the two P-value CSV streams, the summary text, and the
//! tab-separated psi-histogram (spec.md §6, §4.6).

use anyhow::{Context, Result};
use sigscan::driver::Summary;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Opens a `l,tau,P-value` CSV writer at `path`, writing the header row.
pub fn csv_writer(path: &Path) -> Result<csv::Writer<File>> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("unable to create {}", path.display()))?;
    writer
        .write_record(["l", "tau", "P-value"])
        .with_context(|| format!("unable to write header to {}", path.display()))?;
    Ok(writer)
}

/// Appends one `(l, tau, p)` record to an open CSV writer.
pub fn write_record(writer: &mut csv::Writer<File>, l: usize, tau: usize, p: f64) -> Result<()> {
    writer
        .write_record(&[l.to_string(), tau.to_string(), format!("{p:e}")])
        .context("unable to write interval record")
}

/// Writes the end-of-run summary text (spec.md §6): `N`, `n`, `L`,
/// per-stratum `(Nt[k], nt[k])`, intervals processed, maximum layer
/// reached, `L_max`, final `pth`, `m`, and `delta_star`.
pub fn write_summary(path: &Path, summary: &Summary) -> Result<()> {
    let file = File::create(path).with_context(|| format!("unable to create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "N\t{}", summary.n_obs)?;
    writeln!(out, "n\t{}", summary.n_pos)?;
    writeln!(out, "L\t{}", summary.seq_len)?;
    writeln!(out, "K\t{}", summary.strata.len())?;
    for (k, &(nt, npos)) in summary.strata.iter().enumerate() {
        writeln!(out, "Nt[{k}]\t{nt}")?;
        writeln!(out, "nt[{k}]\t{npos}")?;
    }
    writeln!(out, "intervals_processed\t{}", summary.intervals_processed)?;
    writeln!(out, "max_layer_reached\t{}", summary.max_layer_len)?;
    writeln!(out, "L_max\t{}", summary.l_max)?;
    writeln!(out, "final_pth\t{:e}", summary.pth)?;
    writeln!(out, "m\t{}", summary.m)?;
    match summary.delta_star {
        Some(delta) => writeln!(out, "delta_star\t{delta:e}")?,
        None => writeln!(out, "delta_star\tno testable intervals")?,
    }
    writeln!(out, "pass1_elapsed_ms\t{}", summary.pass1_elapsed.as_millis())?;
    writeln!(out, "pass2_elapsed_ms\t{}", summary.pass2_elapsed.as_millis())?;

    out.flush().context("unable to flush summary file")
}

/// Opens a psi-histogram writer at `path` (spec.md §6): one
/// `bucket_index\tcount` line per bucket, written by repeated calls to
/// [`write_histogram_bucket`].
pub fn histogram_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("unable to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Appends one `bucket\tcount` line to an open histogram writer.
pub fn write_histogram_bucket(writer: &mut BufWriter<File>, bucket: usize, count: u64) -> Result<()> {
    writeln!(writer, "{bucket}\t{count}").context("unable to write histogram bucket")
}
