//! The p-value estimator: reconstructs `P(ES_random >= ES)` from the cutoff
//! ladder recorded by [`super::calc_pvalues`]. Grounded on
//! `fgseaMultilevelSupplement.cpp`'s `findEsPval`, with digamma supplied by
//! `statrs` (already a teacher dependency, used today for `Hypergeometric`
//! in `ora.rs`) instead of a hand-rolled series/asymptotic implementation.

use super::driver::EsPvalConnection;
use super::Sign;
use statrs::function::gamma::digamma;

/// Computes the tail probability at `es` from an already-built
/// [`EsPvalConnection`]. `m` must match the `m` passed to `calc_pvalues`.
pub fn find_es_pval(state: &EsPvalConnection, es: f64, m: usize, sign: Sign) -> f64 {
    let half = (m + 1) / 2;
    let i = state
        .cutoffs
        .partition_point(|&cutoff| cutoff < es);

    let level = i / half;
    let remainder = m - (i % half);
    let log_p = level as f64 * (digamma(half as f64) - digamma((m + 1) as f64))
        + (digamma(remainder as f64) - digamma((m + 1) as f64));
    let pval = log_p.exp();

    match sign {
        Sign::OneSided => pval.clamp(0.0, 1.0),
        Sign::TwoSidedCorrected => {
            let prob_stat_pos =
                (digamma(state.pos_stat_num as f64) - digamma((m + 1) as f64)).exp();
            let mut bad_sets = 0usize;
            let total_sets = state.random_pairs.len();
            for &(positive, signed) in &state.random_pairs {
                if signed <= es && positive > es {
                    bad_sets += 1;
                }
            }
            let correction = bad_sets as f64 / total_sets as f64;
            ((pval - correction) / prob_stat_pos).clamp(0.0, 1.0)
        }
    }
}
