//! Numeric kernels: log-factorial cache, per-stratum ψ tables, the
//! two-tailed Fisher exact test, and the χ² survival function.

pub mod chisq;
pub mod fisher;
pub mod logfact;
pub mod psi;
