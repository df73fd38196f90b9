//! The input data model: the sequence matrix, the label vector and the
//! stratification of observations into tables.

use crate::error::{Error, Result};
use crate::kernels::psi::log_psi_table;
use ndarray::Array2;

/// A single stratum ("table" in the statistics literature): a contiguous
/// range of observation indices sharing a covariate value.
#[derive(Debug, Clone, PartialEq)]
pub struct Stratum {
    /// Number of observations in this stratum, `Nt[k]`.
    pub n_total: usize,
    /// Number of positive-class observations in this stratum, `nt[k]`.
    pub n_pos: usize,
    /// `max(nt[k], Nt[k] - nt[k])`: once a support count reaches this bound
    /// in every stratum, further extension can only increase ψ_comb.
    pub hypercorner_bound: usize,
    /// `log ψ_k[x]` for `x` in `[0, n_total]`, the minimum attainable
    /// two-tailed Fisher exact log P-value as a function of the row margin.
    pub log_psi: Vec<f64>,
}

impl Stratum {
    fn new(n_total: usize, n_pos: usize) -> Self {
        let hypercorner_bound = n_pos.max(n_total - n_pos);
        let log_psi = log_psi_table(n_pos, n_total);
        Self {
            n_total,
            n_pos,
            hypercorner_bound,
            log_psi,
        }
    }
}

/// The immutable dataset an [`crate::engine::Engine`] run is performed on.
///
/// `x` is stored row-major, `L` rows by `N` columns, where row `tau`
/// corresponds to sequence position `tau` (a `0`/`1` indicator over the `N`
/// observations). `y` is the length-`N` binary label vector, ordered so
/// that stratum `k` occupies indices `[cum_nt[k], cum_nt[k + 1])`.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Number of observations, `N`.
    pub n_obs: usize,
    /// Sequence length, `L`.
    pub seq_len: usize,
    /// Sequence matrix, row-major `L x N`, entries in `{0, 1}`.
    pub x: Array2<u8>,
    /// Label vector, length `N`, entries in `{0, 1}`.
    pub y: Vec<u8>,
    /// Per-stratum metadata, in the order the strata occupy `y`.
    pub strata: Vec<Stratum>,
    /// Prefix sums of stratum sizes, length `K + 1`; stratum `k` occupies
    /// `[cum_nt[k], cum_nt[k + 1])`.
    pub cum_nt: Vec<usize>,
}

impl Dataset {
    /// Builds a dataset from its three constituent inputs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::General`] if `y.len() != x.ncols()`, if the stratum
    /// sizes don't sum to `y.len()`, or if the dataset is empty.
    pub fn new(x: Array2<u8>, y: Vec<u8>, stratum_sizes: &[usize]) -> Result<Self> {
        let n_obs = y.len();
        let seq_len = x.nrows();

        if seq_len == 0 {
            return Err(Error::General("sequence length L must be positive".into()));
        }
        if x.ncols() != n_obs {
            return Err(Error::General(format!(
                "sequence matrix has {} columns but the label vector has {n_obs} entries",
                x.ncols()
            )));
        }
        if stratum_sizes.iter().sum::<usize>() != n_obs {
            return Err(Error::General(format!(
                "stratum sizes sum to {} but N = {n_obs}",
                stratum_sizes.iter().sum::<usize>()
            )));
        }
        if stratum_sizes.is_empty() {
            return Err(Error::General("at least one stratum is required".into()));
        }

        let mut cum_nt = Vec::with_capacity(stratum_sizes.len() + 1);
        cum_nt.push(0);
        for &size in stratum_sizes {
            cum_nt.push(cum_nt.last().unwrap() + size);
        }

        let mut strata = Vec::with_capacity(stratum_sizes.len());
        for k in 0..stratum_sizes.len() {
            let range = cum_nt[k]..cum_nt[k + 1];
            let n_pos = y[range].iter().filter(|&&v| v != 0).count();
            strata.push(Stratum::new(stratum_sizes[k], n_pos));
        }

        Ok(Self {
            n_obs,
            seq_len,
            x,
            y,
            strata,
            cum_nt,
        })
    }

    /// Number of strata, `K`.
    #[must_use]
    pub fn n_strata(&self) -> usize {
        self.strata.len()
    }

    /// Total number of positive-class observations, `n = sum_k nt[k]`.
    #[must_use]
    pub fn n_pos(&self) -> usize {
        self.strata.iter().map(|s| s.n_pos).sum()
    }
}
