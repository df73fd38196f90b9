//! The logarithmic threshold grid and bucket counter from spec.md §4.2: a
//! sequence of candidate corrected-significance thresholds, and the
//! histogram of testable intervals by minimum attainable p-value that lets
//! the engine tighten the threshold in amortized O(1).

/// Number of grid buckets (not counting the trivial threshold `1`).
pub const NGRID: usize = 500;
/// `pgrid` reaches down to `10^LOG10_MIN_PVAL`.
pub const LOG10_MIN_PVAL: f64 = -30.0;

/// Maps a minimum attainable p-value to its bucket in the threshold grid.
#[must_use]
pub fn bucket_idx(pval: f64, log10_p_step: f64) -> usize {
    let idx = (-pval.log10() / log10_p_step).floor();
    if idx < 0.0 {
        0
    } else if idx > NGRID as f64 {
        NGRID
    } else {
        idx as usize
    }
}

/// Threshold grid, bucket histogram and running testable count for one pass
/// of the enumeration engine (spec.md's "Threshold state" entity).
#[derive(Debug, Clone)]
pub struct ThresholdGrid {
    /// Target family-wise error rate.
    pub alpha: f64,
    /// Grid of candidate thresholds, strictly decreasing, `pgrid[0] == 1`.
    pgrid: Vec<f64>,
    /// Decade width of a single bucket.
    log10_p_step: f64,
    /// Current index into `pgrid`.
    idx_th: usize,
    /// Number of testable intervals whose ψ_comb falls in each bucket.
    freq_cnt: Vec<u64>,
    /// Number of intervals currently testable at `pth`.
    m: u64,
}

impl ThresholdGrid {
    /// Builds a fresh grid at `pth = pgrid[1]`, with all buckets empty.
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        let log10_p_step = -LOG10_MIN_PVAL / NGRID as f64;
        let pgrid: Vec<f64> = (0..=NGRID)
            .map(|j| 10f64.powf(-(j as f64) * log10_p_step))
            .collect();

        Self {
            alpha,
            pgrid,
            log10_p_step,
            idx_th: 1,
            freq_cnt: vec![0; NGRID + 1],
            m: 0,
        }
    }

    /// The current tentative corrected significance threshold.
    #[must_use]
    pub fn pth(&self) -> f64 {
        self.pgrid[self.idx_th]
    }

    /// Number of intervals currently testable at [`Self::pth`].
    #[must_use]
    pub fn m(&self) -> u64 {
        self.m
    }

    /// The bucket histogram, indices `0..=NGRID`.
    #[must_use]
    pub fn freq_cnt(&self) -> &[u64] {
        &self.freq_cnt
    }

    /// The corrected significance threshold `alpha / m`, or `None` if no
    /// interval is testable (spec.md §9, Open Question 3).
    #[must_use]
    pub fn delta_star(&self) -> Option<f64> {
        if self.m == 0 {
            None
        } else {
            Some(self.alpha / self.m as f64)
        }
    }

    fn bucket_idx(&self, pval: f64) -> usize {
        bucket_idx(pval, self.log10_p_step)
    }

    /// Records a newly-testable interval and re-establishes `m * pth <=
    /// alpha` by tightening the threshold as many times as necessary.
    pub fn record_testable(&mut self, psi_comb: f64) {
        let bucket = self.bucket_idx(psi_comb);
        self.freq_cnt[bucket] += 1;
        self.m += 1;

        while (self.m as f64) * self.pth() > self.alpha {
            self.decrease_threshold();
        }
        debug_assert!(
            (self.m as f64) * self.pth() <= self.alpha,
            "m * pth must not exceed alpha after a threshold update"
        );
    }

    /// Drops the bucket the threshold is about to pass from `m` and
    /// advances to the next, smaller, grid point.
    fn decrease_threshold(&mut self) {
        self.m -= self.freq_cnt[self.idx_th];
        self.idx_th += 1;
    }

    /// `true` iff `psi_comb` is at or below the current threshold.
    #[must_use]
    pub fn is_testable(&self, psi_comb: f64) -> bool {
        psi_comb <= self.pth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_strictly_decreasing_and_anchored_at_one() {
        let grid = ThresholdGrid::new(0.05);
        assert!((grid.pgrid[0] - 1.0).abs() < 1e-15);
        for i in 1..grid.pgrid.len() {
            assert!(grid.pgrid[i] < grid.pgrid[i - 1]);
        }
        assert!((grid.pgrid[NGRID] - 1e-30).abs() / 1e-30 < 1e-6);
    }

    #[test]
    fn threshold_is_monotone_non_increasing_under_tightening() {
        let mut grid = ThresholdGrid::new(0.05);
        let mut prev_pth = grid.pth();
        for i in 0..2000 {
            // force m to grow without bound so the threshold keeps tightening
            grid.record_testable(10f64.powf(-(f64::from(i) * 0.01)));
            assert!(grid.pth() <= prev_pth);
            assert!((grid.m() as f64) * grid.pth() <= grid.alpha + 1e-12);
            prev_pth = grid.pth();
        }
    }

    #[test]
    fn delta_star_is_none_when_m_is_zero() {
        let grid = ThresholdGrid::new(0.05);
        assert_eq!(grid.delta_star(), None);
    }

    #[test]
    fn delta_star_matches_alpha_over_m() {
        let mut grid = ThresholdGrid::new(0.05);
        grid.record_testable(1e-8);
        grid.record_testable(1e-8);
        assert_eq!(grid.delta_star(), Some(0.05 / 2.0));
    }

    #[test]
    fn bucket_idx_saturates_at_grid_edges() {
        let step = -LOG10_MIN_PVAL / NGRID as f64;
        assert_eq!(bucket_idx(1.0, step), 0);
        assert_eq!(bucket_idx(1e-40, step), NGRID);
    }

    /// S5 -- threshold tightening: `idx_th` advances exactly as many times as
    /// needed to restore `m * pth <= alpha`, and `m` always equals the sum of
    /// `freq_cnt` from `idx_th` onward (buckets below `idx_th` keep their
    /// historical counts but are no longer part of `m`).
    #[test]
    fn s5_threshold_tightening_bucket_identities() {
        let mut grid = ThresholdGrid::new(0.05);
        let mut prev_idx = grid.idx_th;
        for i in 0..500 {
            let psi = 10f64.powf(-(f64::from(i) * 0.05));
            if !grid.is_testable(psi) {
                continue;
            }
            grid.record_testable(psi);
            assert!(grid.idx_th >= prev_idx, "idx_th must never move backward");
            prev_idx = grid.idx_th;
            let live: u64 = grid.freq_cnt[grid.idx_th..].iter().sum();
            assert_eq!(live, grid.m, "m must equal the sum of buckets at or past idx_th");
        }
        assert!(grid.idx_th > 1, "enough testable intervals must have advanced the threshold");
    }
}
