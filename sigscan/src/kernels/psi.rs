//! Per-stratum ψ: the minimum attainable two-tailed Fisher exact p-value as
//! a function of the row margin `x`, for a fixed column margin `n` and
//! total `N`. Shaped like a "W" curve symmetric about `N / 2`.
//!
//! Built via the stable log-space recurrence from spec.md §4.1, grounded on
//! `logpsi_init` in the original source: walk up the left arm from `x = 0`,
//! bootstrap the midpoint from the opposite boundary, walk the right arm
//! down to the midpoint, then mirror across `N / 2`.

/// Builds `log psi[x]` for `x` in `[0, n_total]`.
#[must_use]
pub fn log_psi_table(n_pos: usize, n_total: usize) -> Vec<f64> {
    if n_total == 0 {
        return vec![0.0];
    }

    // The table is symmetric under n -> N - n, so normalize to the smaller
    // margin; the stored table still spans [0, n_total].
    let n = n_pos.min(n_total - n_pos) as i64;
    let big_n = n_total as i64;

    let mut log_psi = vec![0.0_f64; n_total + 1];

    // Left arm, x in [0, n]: log psi[0] = 0, recur forward.
    for x in 1..=n {
        log_psi[x as usize] =
            log_psi[(x - 1) as usize] + ((n - (x - 1)) as f64 / (big_n - (x - 1)) as f64).ln();
    }

    let n_over_2 = if big_n % 2 == 1 { (big_n - 1) / 2 } else { big_n / 2 };

    // Bootstrap xi(N - n_over_2) by walking the mirror recurrence down from
    // N, without materializing intermediate values.
    let x_init = big_n - n_over_2;
    let mut xi = 0.0_f64;
    let mut x = big_n - 1;
    while x >= x_init {
        xi += ((x + 1 - n) as f64 / (x + 1) as f64).ln();
        x -= 1;
    }

    log_psi[n_over_2 as usize] = if big_n % 2 == 1 {
        xi + ((x_init - n) as f64 / x_init as f64).ln()
    } else {
        xi
    };

    // Right arm, x in (n, n_over_2): recur downward from n_over_2.
    let mut x = n_over_2 - 1;
    while x > n {
        log_psi[x as usize] = ((x + 1 - n) as f64 / (x + 1) as f64).ln() + log_psi[(x + 1) as usize];
        x -= 1;
    }

    // Complete the right half by symmetry around N / 2.
    for x in x_init..=big_n {
        log_psi[x as usize] = log_psi[(big_n - x) as usize];
    }

    // Two-tailed doubling at the symmetric point(s).
    if big_n % 2 == 0 {
        if n == big_n / 2 {
            for v in log_psi.iter_mut().take(n_total).skip(1) {
                *v += 2.0_f64.ln();
            }
        } else {
            log_psi[(big_n / 2) as usize] += 2.0_f64.ln();
        }
    }

    log_psi
}
