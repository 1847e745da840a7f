//! The multilevel driver: the adaptive-level-splitting loop that advances a
//! population of gene sets through a ladder of increasing enrichment-score
//! cutoffs. Grounded on `fgseaMultilevelSupplement.cpp`'s `duplicateSets` and
//! `calcPvalues`.

use super::es::{positive_es, signed_es};
use super::perturb::perturb;
use super::{GeneSet, PerturbConfig};
use crate::CoreError;
use ahash::AHashSet;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// The accumulating result container threaded through a single
/// `calc_pvalues` invocation (the source calls this `EsPvalConnection`).
/// `findEsPval` later consumes it read-only.
#[derive(Debug, Clone)]
pub struct EsPvalConnection {
    /// Current population of `m` gene sets.
    pub sets: Vec<GeneSet>,
    /// Append-only, non-decreasing ladder of positive-ES cutoffs, `m/2`
    /// entries per completed duplication round.
    pub cutoffs: Vec<f64>,
    /// `(positiveES, signedES)` for every set in the initial population,
    /// recorded once, used only by the two-sided bias correction.
    pub random_pairs: Vec<(f64, f64)>,
    /// Count of initial-population sets with strictly positive signed ES,
    /// set exactly once.
    pub pos_stat_num: usize,
}

impl EsPvalConnection {
    fn new(sets: Vec<GeneSet>) -> Self {
        EsPvalConnection {
            sets,
            cutoffs: Vec::new(),
            random_pairs: Vec::new(),
            pos_stat_num: 0,
        }
    }

    /// Partitions the population by positive ES, records the lower half's
    /// cutoffs, and promotes the upper half (duplicated) into a fresh
    /// population of the same size `m`.
    ///
    /// The source duplicates the top `ceil(m/2) - 1` sets twice and appends
    /// the median once, which totals `m - 1` sets, not `m` -- see
    /// `DESIGN.md` for why this rewrite instead duplicates the entire upper
    /// half (`ceil(m/2)` sets) twice each, landing on exactly `m`.
    fn duplicate_sets(&mut self, s: &[f64]) {
        let m = self.sets.len();
        let first_round = self.cutoffs.is_empty();

        let mut stats: Vec<(f64, usize)> = Vec::with_capacity(m);
        let mut pos_stat_count = 0usize;
        for (idx, set) in self.sets.iter().enumerate() {
            let ns = set.sum_stat(s);
            let stat = positive_es(s, set, ns);
            let stat_real = signed_es(s, set, ns);
            if first_round {
                self.random_pairs.push((stat, stat_real));
                if stat_real > 0.0 {
                    pos_stat_count += 1;
                }
            }
            stats.push((stat, idx));
        }
        stats.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        if first_round {
            self.pos_stat_num = pos_stat_count;
        }

        let half = (m + 1) / 2;
        self.cutoffs.extend(stats[..half].iter().map(|&(v, _)| v));

        let mut new_sets = Vec::with_capacity(m);
        for &(_, idx) in stats[m - half..].iter() {
            new_sets.push(self.sets[idx].clone());
            new_sets.push(self.sets[idx].clone());
        }
        self.sets = new_sets;
    }
}

fn initial_population<R: Rng>(s_len: usize, k: usize, m: usize, rng: &mut R) -> Vec<GeneSet> {
    (0..m)
        .map(|_| {
            let mut chosen: AHashSet<usize> = AHashSet::default();
            while chosen.len() < k {
                chosen.insert(rng.gen_range(0..s_len));
            }
            let mut indices: Vec<usize> = chosen.into_iter().collect();
            indices.sort_unstable();
            GeneSet::from_sorted(indices)
        })
        .collect()
}

fn validate(s: &[f64], k: usize, es: f64, m: usize) -> Result<(), CoreError> {
    let n = s.len();
    if n == 0 {
        return Err(CoreError::EmptyStatistics);
    }
    if k >= n {
        return Err(CoreError::DegenerateInput { n, k });
    }
    if m < 2 || m % 2 != 0 {
        return Err(CoreError::SampleSizeTooSmall { m });
    }
    if !es.is_finite() {
        return Err(CoreError::NonFiniteScore);
    }
    Ok(())
}

/// Runs the adaptive multilevel sampler for one pathway and returns the
/// resulting [`EsPvalConnection`], ready for [`super::find_es_pval`].
///
/// Deterministic given `seed`: two calls with identical arguments return
/// bit-identical results.
pub fn calc_pvalues(
    s: &[f64],
    k: usize,
    es: f64,
    m: usize,
    seed: u64,
    abs_eps: f64,
    perturb_cfg: &PerturbConfig,
) -> Result<EsPvalConnection, CoreError> {
    validate(s, k, es, m)?;
    println!(
        "Starting multilevel p-value estimation: n={}, k={k}, m={m}, target ES={es}",
        s.len()
    );

    let mut rng = SmallRng::seed_from_u64(seed);
    let sets = initial_population(s.len(), k, m, &mut rng);
    let mut state = EsPvalConnection::new(sets);
    state.duplicate_sets(s);

    let ceiling = -abs_eps.log2();
    let mut level = 0usize;
    loop {
        level = 2 * (state.cutoffs.len() / (m + 1));
        let cutoff = *state.cutoffs.last().unwrap();
        if es < cutoff {
            println!("Stopped after level {level}: ES {es} fell below cutoff {cutoff:e}");
            break;
        }
        if level as f64 > ceiling {
            println!("Stopped at precision ceiling: level {level} exceeds -log2(absEps)={ceiling}");
            break;
        }

        let target_moves = m * k;
        let mut moves = 0usize;
        while moves < target_moves {
            for set in state.sets.iter_mut() {
                moves += perturb(s, set, cutoff, &mut rng, perturb_cfg);
            }
        }
        state.duplicate_sets(s);
    }
    println!("Completed level {level} with {} cutoffs recorded", state.cutoffs.len());
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_statistics(n: usize) -> Vec<f64> {
        (0..n).map(|i| (n - i) as f64 / n as f64).collect()
    }

    #[test]
    fn rejects_degenerate_k_equal_n() {
        let s = vec![1.0, 2.0, 3.0];
        let err = calc_pvalues(&s, 3, 0.5, 10, 42, 1e-10, &PerturbConfig::default()).unwrap_err();
        assert_eq!(err, CoreError::DegenerateInput { n: 3, k: 3 });
    }

    #[test]
    fn rejects_empty_statistics() {
        let err =
            calc_pvalues(&[], 1, 0.5, 10, 42, 1e-10, &PerturbConfig::default()).unwrap_err();
        assert_eq!(err, CoreError::EmptyStatistics);
    }

    #[test]
    fn rejects_odd_or_too_small_sample_size() {
        let s = ramp_statistics(100);
        assert_eq!(
            calc_pvalues(&s, 10, 0.5, 11, 1, 1e-10, &PerturbConfig::default()).unwrap_err(),
            CoreError::SampleSizeTooSmall { m: 11 }
        );
        assert_eq!(
            calc_pvalues(&s, 10, 0.5, 0, 1, 1e-10, &PerturbConfig::default()).unwrap_err(),
            CoreError::SampleSizeTooSmall { m: 0 }
        );
    }

    #[test]
    fn rejects_non_finite_target_score() {
        let s = ramp_statistics(50);
        assert_eq!(
            calc_pvalues(&s, 5, f64::NAN, 10, 1, 1e-10, &PerturbConfig::default()).unwrap_err(),
            CoreError::NonFiniteScore
        );
    }

    #[test]
    fn duplication_keeps_population_size_and_nondecreasing_cutoffs() {
        let s = ramp_statistics(200);
        let mut rng = SmallRng::seed_from_u64(99);
        let sets = initial_population(s.len(), 10, 20, &mut rng);
        let mut state = EsPvalConnection::new(sets);
        let mut prev_last = f64::NEG_INFINITY;
        for _ in 0..5 {
            state.duplicate_sets(&s);
            assert_eq!(state.sets.len(), 20);
            assert!(state.cutoffs.windows(2).all(|w| w[0] <= w[1]));
            assert!(*state.cutoffs.last().unwrap() >= prev_last);
            prev_last = *state.cutoffs.last().unwrap();
            for set in &state.sets {
                assert!(set.is_sorted_unique());
                let ns = set.sum_stat(&s);
                assert!(positive_es(&s, set, ns) >= *state.cutoffs.last().unwrap() - 1e-9);
            }
        }
    }

    #[test]
    fn random_pairs_and_pos_stat_num_are_recorded_exactly_once() {
        let s = ramp_statistics(200);
        let mut rng = SmallRng::seed_from_u64(5);
        let sets = initial_population(s.len(), 10, 20, &mut rng);
        let mut state = EsPvalConnection::new(sets);
        state.duplicate_sets(&s);
        assert_eq!(state.random_pairs.len(), 20);
        let recorded_pos_stat_num = state.pos_stat_num;
        state.duplicate_sets(&s);
        assert_eq!(state.random_pairs.len(), 20);
        assert_eq!(state.pos_stat_num, recorded_pos_stat_num);
    }

    #[test]
    fn deterministic_given_the_same_seed() {
        let s = ramp_statistics(500);
        let a = calc_pvalues(&s, 15, 0.1, 50, 42, 1e-10, &PerturbConfig::default()).unwrap();
        let b = calc_pvalues(&s, 15, 0.1, 50, 42, 1e-10, &PerturbConfig::default()).unwrap();
        assert_eq!(a.cutoffs, b.cutoffs);
        assert_eq!(a.random_pairs, b.random_pairs);
        assert_eq!(a.pos_stat_num, b.pos_stat_num);
    }
}
