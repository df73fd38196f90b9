//! Orchestrates a complete run: pass 1 (threshold discovery), pass 2
//! (significant-interval emission), and the summary report (spec.md §4.5).

use crate::dataset::Dataset;
use crate::engine::Engine;
use crate::grid::ThresholdGrid;
use crate::sink::ReportSink;
use std::time::{Duration, Instant};

/// End-of-run report: the numbers an operator needs to sanity-check a scan
/// and to reproduce the FWER-controlling threshold it used.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Number of observations, `N`.
    pub n_obs: usize,
    /// Number of positive-class observations, `n`.
    pub n_pos: usize,
    /// Sequence length, `L`.
    pub seq_len: usize,
    /// Per-stratum `(Nt[k], nt[k])`.
    pub strata: Vec<(usize, usize)>,
    /// Total intervals processed across both passes.
    pub intervals_processed: u64,
    /// Longest interval length actually reached.
    pub max_layer_len: usize,
    /// Layer cap supplied to the run (`0` = unlimited).
    pub l_max: usize,
    /// Final corrected significance threshold from pass 1.
    pub pth: f64,
    /// Number of testable intervals at `pth`.
    pub m: u64,
    /// The corrected significance level, or `None` if `m == 0`.
    pub delta_star: Option<f64>,
    /// Wall-clock time spent in pass 1.
    pub pass1_elapsed: Duration,
    /// Wall-clock time spent in pass 2.
    pub pass2_elapsed: Duration,
}

/// Runs both passes of the scan over `dataset` with `alpha` as the target
/// family-wise error rate, `chi_square_sf` as the injected chi-squared
/// survival function, and `l_max` as the layer cap (`0` = unlimited).
///
/// `emit_testable` controls whether every testable interval in pass 2 is
/// reported to `sink`, in addition to the significant ones.
pub fn run(
    dataset: &Dataset,
    alpha: f64,
    chi_square_sf: impl Fn(f64, f64) -> f64 + Copy,
    l_max: usize,
    sink: &mut impl ReportSink,
    emit_testable: bool,
) -> Summary {
    let mut grid = ThresholdGrid::new(alpha);

    let pass1_start = Instant::now();
    let mut engine = Engine::new(dataset, chi_square_sf, l_max);
    let pass1_stats = engine.run_pass1(&mut grid);
    let pass1_elapsed = pass1_start.elapsed();

    let pth = grid.pth();
    let m = grid.m();
    let delta_star = grid.delta_star();
    for (bucket, &count) in grid.freq_cnt().iter().enumerate() {
        sink.record_histogram_bucket(bucket, count);
    }

    let pass2_start = Instant::now();
    let pass2_stats = if delta_star.is_some() {
        let mut engine2 = Engine::new(dataset, chi_square_sf, l_max);
        engine2.run_pass2(pth, delta_star, sink, emit_testable)
    } else {
        Default::default()
    };
    let pass2_elapsed = pass2_start.elapsed();

    Summary {
        n_obs: dataset.n_obs,
        n_pos: dataset.n_pos(),
        seq_len: dataset.seq_len,
        strata: dataset.strata.iter().map(|s| (s.n_total, s.n_pos)).collect(),
        intervals_processed: pass1_stats.intervals_processed + pass2_stats.intervals_processed,
        max_layer_len: pass1_stats.max_layer_len.max(pass2_stats.max_layer_len),
        l_max,
        pth,
        m,
        delta_star,
        pass1_elapsed,
        pass2_elapsed,
    }
}
