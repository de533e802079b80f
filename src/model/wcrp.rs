//! Weighted Chinese Restaurant Process seating equations
//!
//! The WCRP biases an ordinary CRP toward an expert-provided partition: a
//! table whose occupants share the candidate item's expert label gets extra
//! seating weight through the concordance factor `K`, with `gamma = 1 - beta`
//! interpolating between ignoring the labels (`gamma = 1`) and following
//! them deterministically (`gamma -> 0`).

use rand::Rng;

use crate::core::config::{ALPHA_PRIME_SCALE, ALPHA_PRIME_SHAPE};
use crate::core::types::SkillHandle;
use crate::model::partition::{ConcordanceScope, Partition};

/// Unnormalized log-probability of joining an occupied table.
pub fn log_seated_weight(
    num_seated: usize,
    concordance: f64,
    log_gamma: f64,
    num_expert_skills: usize,
) -> f64 {
    let gamma = log_gamma.exp();
    let j = num_expert_skills as f64;
    -j.ln() + (num_seated as f64).ln() + (concordance + (1.0 - concordance) * gamma).ln()
        - (1.0 / j + (1.0 - 1.0 / j) * gamma).ln()
}

/// Unnormalized log-probability of opening a new table.
pub fn log_new_table_weight(
    log_alpha_prime: f64,
    log_gamma: f64,
    num_expert_skills: usize,
) -> f64 {
    let j = num_expert_skills as f64;
    -j.ln() + log_alpha_prime + log_gamma
}

/// Log joint probability of the current seating arrangement.
///
/// Replays the generative order: item 0 sits first, then each subsequent
/// item chooses among the tables occupied by lower-numbered items or a new
/// table. This is the slice-sampling target for both hyperparameters.
pub fn seating_log_prob(
    partition: &Partition,
    expert_labels: &[usize],
    num_expert_skills: usize,
    log_alpha_prime: f64,
    log_gamma: f64,
) -> f64 {
    let mut log_prob = 0.0;
    // occupancy among items 0..item, in first-seen order for determinism
    let mut counts_so_far: Vec<(SkillHandle, usize)> = Vec::new();

    for item in 0..partition.num_items() {
        let chosen = partition.seat_of(item).expect("item not seated");
        let mut chosen_weight = None;
        let mut total = 0.0;

        for &(handle, count) in &counts_so_far {
            let concordance = partition.expert_concordance(
                item,
                handle,
                expert_labels,
                num_expert_skills,
                log_gamma.exp(),
                ConcordanceScope::Generative,
            );
            let weight =
                log_seated_weight(count, concordance, log_gamma, num_expert_skills).exp();
            total += weight;
            if handle == chosen {
                chosen_weight = Some(weight);
            }
        }

        let new_weight = log_new_table_weight(log_alpha_prime, log_gamma, num_expert_skills).exp();
        total += new_weight;

        log_prob += chosen_weight.unwrap_or(new_weight).ln() - total.ln();

        match counts_so_far.iter().position(|&(h, _)| h == chosen) {
            Some(idx) => counts_so_far[idx].1 += 1,
            None => counts_so_far.push((chosen, 1)),
        }
    }

    assert!(log_prob.is_finite(), "non-finite seating log-probability");
    log_prob
}

/// Log-density (up to a constant) of the gamma prior on `alpha'`, expressed
/// on the log scale.
pub fn log_alpha_prime_prior(log_alpha_prime: f64) -> f64 {
    (ALPHA_PRIME_SHAPE - 1.0) * log_alpha_prime - log_alpha_prime.exp() / ALPHA_PRIME_SCALE
}

/// Flat prior on `log gamma` (proportional to uniform for `log gamma <= 0`).
pub fn log_gamma_prior(log_gamma: f64) -> f64 {
    debug_assert!(log_gamma <= 0.0);
    0.0
}

/// Draw an index from a categorical distribution given unnormalized
/// log-weights.
pub fn sample_log_weighted<R: Rng + ?Sized>(rng: &mut R, log_weights: &[f64]) -> usize {
    assert!(!log_weights.is_empty(), "no weights to sample from");
    let max = log_weights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = log_weights.iter().map(|lw| (lw - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    let mut remaining = rng.gen::<f64>() * total;
    for (idx, &weight) in weights.iter().enumerate() {
        if remaining < weight {
            return idx;
        }
        remaining -= weight;
    }
    weights.len() - 1
}
