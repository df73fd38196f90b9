//! Per-interval state: the OR-accumulated membership buffers and
//! per-stratum support counts the engine carries across a single pass
//! (spec.md §4.3).

use ndarray::Array2;

/// The mutable state a pass over the interval lattice carries: the OR
/// accumulator reused across layers, the per-start/per-stratum support
/// counts, and the last computed minimum attainable p-value per start.
#[derive(Debug, Clone)]
pub struct IntervalState {
    /// Immutable snapshot of the dataset's sequence matrix, `L x N`.
    x_tr: Array2<u8>,
    /// OR of `x_tr[tau..tau + l - 1]` for the layer currently being
    /// processed; reset to all-zero at the start of each pass (layer-1
    /// processing then folds in `x_tr[tau]` through the same extension
    /// step as every other layer).
    x_par: Array2<u8>,
    /// `freq_par[tau][k]`: count of 1-bits of `x_par[tau]` restricted to
    /// stratum `k`.
    freq_par: Array2<u64>,
    /// `pmh_min_par[tau]`: last computed ψ_comb for the interval starting
    /// at `tau`.
    pmh_min_par: Vec<f64>,
}

impl IntervalState {
    /// Builds interval state for a dataset with `seq_len` rows and `n_strata`
    /// strata, with `x_tr` fixed to `x` for the lifetime of the run.
    #[must_use]
    pub fn new(x: Array2<u8>, n_strata: usize) -> Self {
        let (seq_len, n_obs) = (x.nrows(), x.ncols());
        Self {
            x_tr: x,
            x_par: Array2::zeros((seq_len, n_obs)),
            freq_par: Array2::zeros((seq_len, n_strata)),
            pmh_min_par: vec![0.0; seq_len],
        }
    }

    /// Resets `x_par` to all-zero and `freq_par` to all-zero, as required
    /// at the start of every pass.
    pub fn reset_pass(&mut self) {
        let (seq_len, n_obs) = (self.x_tr.nrows(), self.x_tr.ncols());
        self.x_par = Array2::zeros((seq_len, n_obs));
        self.freq_par.fill(0);
        self.pmh_min_par.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Row `tau` of the immutable dataset snapshot.
    #[must_use]
    pub fn x_tr_row(&self, tau: usize) -> ndarray::ArrayView1<'_, u8> {
        self.x_tr.row(tau)
    }

    /// Support counts `freq_par[tau]`, one entry per stratum.
    #[must_use]
    pub fn freq_par_row(&self, tau: usize) -> ndarray::ArrayView1<'_, u64> {
        self.freq_par.row(tau)
    }

    /// Last computed ψ_comb for the interval starting at `tau`.
    #[must_use]
    pub fn pmh_min(&self, tau: usize) -> f64 {
        self.pmh_min_par[tau]
    }

    /// Records the ψ_comb just computed for the interval starting at `tau`.
    pub fn set_pmh_min(&mut self, tau: usize, value: f64) {
        self.pmh_min_par[tau] = value;
    }

    /// Extends the OR accumulator at `tau` with the new row `x_tr[new_row]`
    /// (the rightmost position entering the interval), updating
    /// `freq_par[tau]` for each stratum whose membership changed.
    ///
    /// `strata_ranges` gives the `[start, end)` column range owned by each
    /// stratum.
    pub fn extend(&mut self, tau: usize, new_row: usize, strata_ranges: &[(usize, usize)]) {
        let new_row_vals = self.x_tr.row(new_row).to_owned();
        let mut par_row = self.x_par.row_mut(tau);
        let mut freq_row = self.freq_par.row_mut(tau);

        for (k, &(start, end)) in strata_ranges.iter().enumerate() {
            let mut delta = 0u64;
            for j in start..end {
                if par_row[j] == 0 && new_row_vals[j] != 0 {
                    par_row[j] = 1;
                    delta += 1;
                }
            }
            freq_row[k] += delta;
        }
    }

    /// Cell counts `a_k = |{j in stratum k : x_par[tau][j] = 1 and y[j] =
    /// 1}|`, computed only when an interval is found testable.
    #[must_use]
    pub fn cell_counts(&self, tau: usize, y: &[u8], strata_ranges: &[(usize, usize)]) -> Vec<usize> {
        let par_row = self.x_par.row(tau);
        strata_ranges
            .iter()
            .map(|&(start, end)| {
                (start..end)
                    .filter(|&j| par_row[j] != 0 && y[j] != 0)
                    .count()
            })
            .collect()
    }
}
