//! Cache of `ln(x!)` for `x` in `[0, n]`, used throughout the Fisher exact
//! kernels. Values are computed via the log-gamma function (`ln(x!) =
//! lgamma(x + 1)`), which stays well-conditioned over the `N` range this
//! crate is built for; overflow is not a concern (spec.md §4.4).

/// Natural logarithm of the gamma function, `ln(Gamma(x))`, for `x > 0`.
///
/// Lanczos approximation (g = 7, n = 9), accurate to about 15 significant
/// digits across the positive reals — the same approach numeric libraries
/// use to back `lgamma`.
#[must_use]
pub fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula for the left half of the plane; unused in this
        // crate (all arguments are non-negative integers + 1) but kept so
        // the kernel is a total function over its documented domain.
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut a = COEFFS[0];
    let t = x + G + 0.5;
    for (i, &c) in COEFFS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

/// Precomputed `ln(x!)` for `x` in `[0, n]`.
#[derive(Debug, Clone)]
pub struct LogFactorialCache {
    values: Vec<f64>,
}

impl LogFactorialCache {
    /// Builds the cache for `x` in `[0, n]`.
    #[must_use]
    pub fn new(n: usize) -> Self {
        let mut values = Vec::with_capacity(n + 1);
        values.push(0.0); // ln(0!) = 0
        for x in 1..=n {
            values.push(ln_gamma(x as f64 + 1.0));
        }
        Self { values }
    }

    /// Returns `ln(x!)`.
    ///
    /// # Panics
    ///
    /// Panics if `x` is outside the cache's range; the caller is expected
    /// to size the cache to the largest margin it will query.
    #[must_use]
    pub fn ln_fact(&self, x: usize) -> f64 {
        self.values[x]
    }
}
