//! Enrichment-score primitives, all O(k) over a sorted [`GeneSet`].
//!
//! Grounded on `fgseaMultilevelSupplement.cpp`'s `calcES`/`calcPositiveES`/
//! `compareStat` (see `examples/original_source`): a Kolmogorov-Smirnov-style
//! running sum that steps down by `q1 = 1/(n-k)` between hits and up by
//! `q2 * S[pos] / NS` at each hit.

use super::GeneSet;

/// Signed enrichment score: the running-sum value of largest absolute
/// magnitude encountered at any step boundary. `ns` is `sum(S[pos] for pos
/// in set)`, precomputed by the caller to avoid an O(k) pass per call on
/// the MCMC hot path.
pub fn signed_es(s: &[f64], set: &GeneSet, ns: f64) -> f64 {
    let n = s.len();
    let k = set.len();
    let q1 = 1.0 / (n - k) as f64;
    let q2 = 1.0 / ns;
    let mut res = 0.0_f64;
    let mut cur = 0.0_f64;
    let mut last: isize = -1;
    for &pos in set.as_slice() {
        cur -= q1 * (pos as isize - last - 1) as f64;
        if cur.abs() > res.abs() {
            res = cur;
        }
        cur += q2 * s[pos];
        if cur.abs() > res.abs() {
            res = cur;
        }
        last = pos as isize;
    }
    res
}

/// Convenience wrapper that computes `NS` itself. Not used inside the
/// perturbation kernel, where `NS` is tracked incrementally.
pub fn signed_es_fresh(s: &[f64], set: &GeneSet) -> f64 {
    signed_es(s, set, set.sum_stat(s))
}

/// Positive enrichment score: the running maximum (never the magnitude) of
/// the same running sum, floored at zero. Monotone with the signed ES when
/// the signed ES is positive, which is what makes it usable as the MCMC
/// potential.
pub fn positive_es(s: &[f64], set: &GeneSet, ns: f64) -> f64 {
    let n = s.len();
    let k = set.len();
    let q1 = 1.0 / (n - k) as f64;
    let q2 = 1.0 / ns;
    let mut res = 0.0_f64;
    let mut cur = 0.0_f64;
    let mut last: isize = -1;
    for &pos in set.as_slice() {
        cur += q2 * s[pos] - q1 * (pos as isize - last - 1) as f64;
        res = res.max(cur);
        last = pos as isize;
    }
    res
}

pub fn positive_es_fresh(s: &[f64], set: &GeneSet) -> f64 {
    positive_es(s, set, set.sum_stat(s))
}

/// Bounded comparator: the acceptance predicate of the perturbation kernel.
/// Returns `true` as soon as the running sum exceeds `bound`, short-circuiting
/// the traversal; returns `false` only after a full pass finds no such step.
/// MUST NOT be implemented by calling [`positive_es`] and comparing -- that
/// would double the cost of every perturbation proposal.
pub fn compare_stat(s: &[f64], set: &GeneSet, ns: f64, bound: f64) -> bool {
    let n = s.len();
    let k = set.len();
    let q1 = 1.0 / (n - k) as f64;
    let q2 = 1.0 / ns;
    let mut cur = 0.0_f64;
    let mut last: isize = -1;
    for &pos in set.as_slice() {
        cur += q2 * s[pos] - q1 * (pos as isize - last - 1) as f64;
        if cur > bound {
            return true;
        }
        last = pos as isize;
    }
    false
}
