//! MCMC perturbation kernel: single-index replacement moves that keep a
//! [`GeneSet`] a valid, sorted `k`-subset with positive ES above a bound.
//!
//! Grounded on `fgseaMultilevelSupplement.cpp`'s `perturbate`: each proposal
//! swaps one index for a fresh uniform draw, restores sort order by
//! bubble-swapping it into place, and accepts iff uniqueness holds and the
//! bounded comparator still clears `bound`. `NS` (the sum of statistics at
//! member positions) is maintained incrementally across proposals -- never
//! recomputed -- since this is the hot inner loop of the whole estimator.

use super::es::compare_stat;
use super::{GeneSet, PerturbConfig};
use rand::Rng;

/// Runs `max(1, floor(k * cfg.coeff))` proposal iterations against `set`,
/// mutating it in place, and returns the number of accepted moves.
pub fn perturb<R: Rng + ?Sized>(
    s: &[f64],
    set: &mut GeneSet,
    bound: f64,
    rng: &mut R,
    cfg: &PerturbConfig,
) -> usize {
    let n = s.len();
    let k = set.len();
    let mut ns = set.sum_stat(s);
    let iters = std::cmp::max(1, (k as f64 * cfg.coeff) as usize);
    let mut moves = 0;

    for _ in 0..iters {
        let mut id = rng.gen_range(0..k);
        let candidate = rng.gen_range(0..n);
        let old = set.as_slice()[id];
        ns -= s[old];

        {
            let p = set.as_mut_slice();
            p[id] = candidate;
            while id > 0 && p[id] < p[id - 1] {
                p.swap(id, id - 1);
                id -= 1;
            }
            while id < k - 1 && p[id] > p[id + 1] {
                p.swap(id, id + 1);
                id += 1;
            }
        }

        let duplicate = {
            let p = set.as_slice();
            (id > 0 && p[id] == p[id - 1]) || (id < k - 1 && p[id] == p[id + 1])
        };
        let accepted =
            !duplicate && compare_stat(s, set, ns + s[set.as_slice()[id]], bound);

        if accepted {
            moves += 1;
        } else {
            let p = set.as_mut_slice();
            p[id] = old;
            while id > 0 && p[id] < p[id - 1] {
                p.swap(id, id - 1);
                id -= 1;
            }
            while id < k - 1 && p[id] > p[id + 1] {
                p.swap(id, id + 1);
                id += 1;
            }
        }
        ns += s[set.as_slice()[id]];
    }
    moves
}
