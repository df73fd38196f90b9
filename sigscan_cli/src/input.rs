//! Parsing of the dataset matrix, label vector, and covariate (stratum
//! size) files -- the "external collaborator" spec.md treats as out of
//! scope for the core engine.
//!
//! Grounded on `get_L`/`read_dataset_file`/`read_labels_file`/`get_K`/
//! `read_covariates_file` in the original source: every reader scans its
//! file byte-by-byte, keeps only the characters it cares about, and
//! ignores everything else (whitespace, stray punctuation). The dataset
//! and label files keep only `'0'`/`'1'`; the covariate file keeps only
//! ASCII digits and newlines.

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use std::fs;
use std::path::Path;

/// Reads the sequence matrix from `path`: `seq_len` lines, each holding
/// `n_obs` `'0'`/`'1'` characters in sequence-position order. Every other
/// byte in the file (newlines included) is ignored, so the file's literal
/// line breaks are cosmetic -- the reader only cares that it finds
/// exactly `seq_len * n_obs` bits.
pub fn read_sequence_matrix(path: &Path, seq_len: usize, n_obs: usize) -> Result<Array2<u8>> {
    let bits = read_bits(path)?;
    let expected = seq_len * n_obs;
    if bits.len() != expected {
        bail!(
            "{}: found {} bits, expected seq_len * n_obs = {seq_len} * {n_obs} = {expected}",
            path.display(),
            bits.len()
        );
    }
    Array2::from_shape_vec((seq_len, n_obs), bits)
        .context("sequence matrix bit count did not match its declared shape")
}

/// Reads the label vector from `path`: a stream of `n_obs` `'0'`/`'1'`
/// characters, ordered so stratum `k` occupies `[cum_nt[k], cum_nt[k +
/// 1])` -- the caller is responsible for supplying a file whose labels are
/// already grouped by stratum.
pub fn read_labels(path: &Path, n_obs: usize) -> Result<Vec<u8>> {
    let bits = read_bits(path)?;
    if bits.len() != n_obs {
        bail!("{}: found {} labels, expected N = {n_obs}", path.display(), bits.len());
    }
    Ok(bits)
}

/// Counts the sequence length `L`: the number of newlines in the dataset
/// matrix file (mirrors `get_L`, which counts lines rather than bits so a
/// trailing partial line is still detected as an error later by
/// [`read_sequence_matrix`]'s bit-count check).
pub fn count_lines(path: &Path) -> Result<usize> {
    let contents = fs::read(path).with_context(|| format!("unable to open {}", path.display()))?;
    Ok(contents.iter().filter(|&&b| b == b'\n').count())
}

/// Reads the per-stratum sizes `Nt[0..K)` from `path`: one decimal integer
/// per line (mirrors `read_covariates_file`).
pub fn read_stratum_sizes(path: &Path) -> Result<Vec<usize>> {
    let contents = fs::read_to_string(path).with_context(|| format!("unable to open {}", path.display()))?;

    let mut sizes = Vec::new();
    let mut current: Option<usize> = None;
    for byte in contents.bytes() {
        match byte {
            b'0'..=b'9' => {
                let digit = usize::from(byte - b'0');
                current = Some(current.unwrap_or(0) * 10 + digit);
            }
            b'\n' => {
                if let Some(value) = current.take() {
                    sizes.push(value);
                }
            }
            _ => {}
        }
    }
    if let Some(value) = current {
        sizes.push(value);
    }
    if sizes.is_empty() {
        bail!("{}: no stratum sizes found", path.display());
    }
    Ok(sizes)
}

/// Scans `path` keeping only `'0'`/`'1'` bytes, in file order.
fn read_bits(path: &Path) -> Result<Vec<u8>> {
    let contents = fs::read(path).with_context(|| format!("unable to open {}", path.display()))?;
    Ok(contents
        .into_iter()
        .filter_map(|b| match b {
            b'0' => Some(0),
            b'1' => Some(1),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn counts_lines_ignoring_content() {
        let f = write_tmp("0101\n1100\n0011\n");
        assert_eq!(count_lines(f.path()).unwrap(), 3);
    }

    #[test]
    fn reads_sequence_matrix_ignoring_whitespace() {
        let f = write_tmp("01 01\n 1100\n0011\n");
        let m = read_sequence_matrix(f.path(), 3, 4).unwrap();
        assert_eq!(m.row(0).to_vec(), vec![0, 1, 0, 1]);
        assert_eq!(m.row(1).to_vec(), vec![1, 1, 0, 0]);
        assert_eq!(m.row(2).to_vec(), vec![0, 0, 1, 1]);
    }

    #[test]
    fn rejects_wrong_bit_count() {
        let f = write_tmp("010\n");
        assert!(read_sequence_matrix(f.path(), 1, 4).is_err());
    }

    #[test]
    fn reads_labels() {
        let f = write_tmp("0000011111");
        assert_eq!(read_labels(f.path(), 10).unwrap(), vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn reads_stratum_sizes() {
        let f = write_tmp("4\n4\n2\n");
        assert_eq!(read_stratum_sizes(f.path()).unwrap(), vec![4, 4, 2]);
    }
}
