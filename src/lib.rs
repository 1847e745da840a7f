pub mod mcmc_pvalue;

use std::fmt;

/// Preconditions the core assumes are validated by the caller.
/// Every variant is a precondition failure, never a transient or I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// `S` has length zero; there is nothing to sample a gene set from.
    EmptyStatistics,
    /// `k >= n`: the `1 / (n - k)` step size in the ES kernel would divide by
    /// zero or go negative.
    DegenerateInput { n: usize, k: usize },
    /// `m < 2`, or `m` is odd. The duplication scheme in `duplicate_sets`
    /// only produces exactly `m` sets when `m` is even.
    SampleSizeTooSmall { m: usize },
    /// `ES` is `NaN` or infinite.
    NonFiniteScore,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::EmptyStatistics => write!(f, "gene statistics vector is empty"),
            CoreError::DegenerateInput { n, k } => write!(
                f,
                "degenerate input: pathway size k={k} must be strictly less than n={n}"
            ),
            CoreError::SampleSizeTooSmall { m } => write!(
                f,
                "sample size m={m} must be even and at least 2"
            ),
            CoreError::NonFiniteScore => write!(f, "observed enrichment score is not finite"),
        }
    }
}

impl std::error::Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_human_readable() {
        assert!(CoreError::EmptyStatistics.to_string().contains("empty"));
        assert!(CoreError::DegenerateInput { n: 5, k: 5 }
            .to_string()
            .contains("k=5"));
    }
}
