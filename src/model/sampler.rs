//! The WCRP+BKT sampler: chain state, sweep driver, and sample recorder
//!
//! One `Sampler` owns one Markov chain over item-to-skill partitions. Skill
//! assignments move by auxiliary-variable Gibbs sampling (the marginal
//! likelihood of opening a new skill is approximated by Monte Carlo
//! averaging over a fixed pool of prior draws), BKT parameters and the two
//! WCRP hyperparameters move by slice sampling. The random generator is
//! never owned; every drawing entry point takes it explicitly, and draws
//! happen in a fixed documented order so a seeded run is reproducible.

use std::time::Instant;

use ahash::AHashSet;
use ordered_float::OrderedFloat;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::core::config::{
    ALPHA_PRIME_SCALE, ALPHA_PRIME_SHAPE, BKT_BRACKET_WIDTH, HYPER_BRACKET_WIDTH,
    LOG_ALPHA_PRIME_BOUNDS, LOG_GAMMA_BOUNDS, ONE_MINUS_TOL, TOL,
};
use crate::core::error::{ModelError, Result};
use crate::core::types::{ItemId, SkillHandle, StudentId, TrialIndex};
use crate::data::dataset::Dataset;
use crate::model::bkt::{self, BktParam, BktParams};
use crate::model::partition::{ConcordanceScope, Partition};
use crate::model::slice::slice_sample;
use crate::model::wcrp;

pub struct Sampler {
    // dataset-derived indexes, immutable after construction
    train_students: AHashSet<StudentId>,
    test_students: AHashSet<StudentId>,
    /// Per-student (item, recall) pairs in study order
    sequences: Vec<Vec<(ItemId, bool)>>,
    expert_labels: Vec<usize>,
    num_students: usize,
    num_items: usize,
    num_expert_skills: usize,
    num_subsamples: usize,
    /// Expert labels followed deterministically (beta == 1)
    use_expert_labels: bool,
    /// `first_encounter[student][item]` = earliest trial of the item, or the
    /// sequence length if the student never studied it
    first_encounter: Vec<Vec<TrialIndex>>,
    /// `item_trials[item]` = (training student, sorted trial indices) pairs
    item_trials: Vec<Vec<(StudentId, Vec<TrialIndex>)>>,
    /// Training students who ever studied each item
    students_who_studied: Vec<Vec<StudentId>>,
    /// First encounters aligned with `students_who_studied`
    item_first_exposures: Vec<Vec<TrialIndex>>,
    /// `ever_studied[student][item]`, training students only
    ever_studied: Vec<Vec<bool>>,
    /// Visit order for the Gibbs step, reshuffled every sweep
    item_order: Vec<ItemId>,

    // Markov chain state
    partition: Partition,
    log_alpha_prime: f64,
    log_gamma: f64,

    // auxiliary variables for the non-conjugate Gibbs step
    prior_pool: Vec<BktParams>,
    /// `singleton_log_lik[item][subsample]` = marginal log-likelihood of the
    /// item as a singleton skill under the pool draw
    singleton_log_lik: Vec<Vec<f64>>,

    // recorded samples
    /// `predicted_recall[student][trial]` accumulates one entry per sample
    predicted_recall: Vec<Vec<Vec<f64>>>,
    label_samples: Vec<Vec<usize>>,
    train_ll_samples: Vec<f64>,
}

impl Sampler {
    /// Build a sampler for one (replication, fold) chain.
    ///
    /// Seats every item at its expert-provided label and, unless the labels
    /// are followed deterministically, precomputes the singleton
    /// marginal log-likelihood of every item under a shared pool of
    /// `num_subsamples` prior draws. The precomputed table is what lets the
    /// Gibbs step price its "new skill" candidates without any per-sweep
    /// likelihood recomputation.
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        dataset: &Dataset,
        train_students: AHashSet<StudentId>,
        test_students: AHashSet<StudentId>,
        beta: f64,
        init_alpha_prime: Option<f64>,
        num_subsamples: usize,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&beta) {
            return Err(ModelError::InvalidArgument(format!(
                "beta must lie in [0, 1], got {}",
                beta
            )));
        }
        if train_students.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        let num_students = dataset.num_students;
        let num_items = dataset.num_items;
        for &student in train_students.iter().chain(test_students.iter()) {
            if student >= num_students {
                return Err(ModelError::InvalidArgument(format!(
                    "student id {} out of range (dataset has {})",
                    student, num_students
                )));
            }
        }
        if train_students.iter().any(|s| test_students.contains(s)) {
            return Err(ModelError::InvalidArgument(
                "train and test student sets overlap".into(),
            ));
        }
        if let Some(alpha_prime) = init_alpha_prime {
            if alpha_prime <= 0.0 {
                return Err(ModelError::InvalidArgument(format!(
                    "alpha' must be positive, got {}",
                    alpha_prime
                )));
            }
        }
        let use_expert_labels = (1.0 - beta).abs() <= TOL;
        if !use_expert_labels && num_subsamples == 0 {
            return Err(ModelError::InvalidArgument(
                "need at least one auxiliary prior draw per Gibbs step".into(),
            ));
        }

        // per-(student, item) trial indexes, computed once so the chain never
        // rescans raw sequences
        let mut sequences = Vec::with_capacity(num_students);
        let mut first_encounter = Vec::with_capacity(num_students);
        let mut trials_studied: Vec<Vec<Vec<TrialIndex>>> = Vec::with_capacity(num_students);
        for student in 0..num_students {
            let items = &dataset.item_sequences[student];
            let recalls = &dataset.recall_sequences[student];
            let mut first = vec![items.len(); num_items];
            let mut studied: Vec<Vec<TrialIndex>> = vec![Vec::new(); num_items];
            let mut sequence = Vec::with_capacity(items.len());
            for (trial, (&item, &recall)) in items.iter().zip(recalls).enumerate() {
                first[item] = first[item].min(trial);
                studied[item].push(trial);
                sequence.push((item, recall));
            }
            sequences.push(sequence);
            first_encounter.push(first);
            trials_studied.push(studied);
        }

        let mut ever_studied = vec![vec![false; num_items]; num_students];
        for &student in &train_students {
            for &(item, _) in &sequences[student] {
                ever_studied[student][item] = true;
            }
        }

        let mut item_trials = vec![Vec::new(); num_items];
        let mut students_who_studied = vec![Vec::new(); num_items];
        let mut item_first_exposures = vec![Vec::new(); num_items];
        for item in 0..num_items {
            for student in 0..num_students {
                if ever_studied[student][item] {
                    item_trials[item].push((student, trials_studied[student][item].clone()));
                    students_who_studied[item].push(student);
                    item_first_exposures[item].push(first_encounter[student][item]);
                }
            }
        }

        let log_alpha_prime = match init_alpha_prime {
            Some(alpha_prime) => alpha_prime.ln(),
            None => Gamma::new(ALPHA_PRIME_SHAPE, ALPHA_PRIME_SCALE)
                .expect("prior hyperparameters are positive")
                .sample(rng)
                .ln(),
        };
        let log_gamma = (1.0 - beta).ln();

        // seat every item at its expert-provided skill
        let mut partition = Partition::new(num_items);
        let mut label_handles: Vec<Option<SkillHandle>> = vec![None; dataset.num_expert_skills];
        for item in 0..num_items {
            let label = dataset.expert_labels[item];
            match label_handles[label] {
                Some(handle) => partition.assign(item, handle, &item_trials[item]),
                None => {
                    let handle =
                        partition.assign_new(item, BktParams::draw_prior(rng), &item_trials[item]);
                    label_handles[label] = Some(handle);
                }
            }
        }

        let missing = (0..num_items)
            .filter(|&item| students_who_studied[item].is_empty())
            .count();
        if missing > 0 {
            tracing::warn!(
                "{} of {} items have no training data and contribute no likelihood evidence",
                missing,
                num_items
            );
        }

        let predicted_recall = sequences
            .iter()
            .map(|sequence| vec![Vec::new(); sequence.len()])
            .collect();

        let mut sampler = Self {
            train_students,
            test_students,
            sequences,
            expert_labels: dataset.expert_labels.clone(),
            num_students,
            num_items,
            num_expert_skills: dataset.num_expert_skills,
            num_subsamples,
            use_expert_labels,
            first_encounter,
            item_trials,
            students_who_studied,
            item_first_exposures,
            ever_studied,
            item_order: (0..num_items).collect(),
            partition,
            log_alpha_prime,
            log_gamma,
            prior_pool: Vec::new(),
            singleton_log_lik: Vec::new(),
            predicted_recall,
            label_samples: Vec::new(),
            train_ll_samples: Vec::new(),
        };

        if !use_expert_labels {
            sampler.precompute_singleton_likelihoods(rng);
        }

        Ok(sampler)
    }

    /// Draw the shared prior pool and, for every item, the marginal
    /// log-likelihood it would have as a singleton skill under each draw.
    ///
    /// Each item is briefly removed from its table, seated alone, evaluated
    /// under every pool draw, and restored.
    fn precompute_singleton_likelihoods<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.prior_pool = (0..self.num_subsamples)
            .map(|_| BktParams::draw_prior(rng))
            .collect();
        self.singleton_log_lik = vec![Vec::new(); self.num_items];

        for item in 0..self.num_items {
            let seat = self.partition.seat_of(item).expect("item not seated");
            let died = self.partition.remove(item, seat, &self.item_trials[item]);

            let singleton =
                self.partition
                    .assign_new(item, self.prior_pool[0], &self.item_trials[item]);
            let mut log_liks = Vec::with_capacity(self.num_subsamples);
            for params in &self.prior_pool {
                log_liks.push(bkt::skill_log_likelihood(
                    self.partition.trials(singleton),
                    &self.sequences,
                    params,
                    &self.students_who_studied[item],
                    &self.item_first_exposures[item],
                ));
            }
            self.singleton_log_lik[item] = log_liks;
            self.partition.remove(item, singleton, &self.item_trials[item]);

            // restore the original assignment; a table that died with the
            // removal is rebuilt with fresh prior parameters
            if died {
                self.partition
                    .assign_new(item, BktParams::draw_prior(rng), &self.item_trials[item]);
            } else {
                self.partition.assign(item, seat, &self.item_trials[item]);
            }
        }
    }

    /// Run the Markov chain for `num_iterations` sweeps, recording a sample
    /// after each post-burn-in sweep.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        num_iterations: usize,
        burn: usize,
        infer_beta: bool,
        infer_alpha_prime: bool,
    ) -> Result<()> {
        if num_iterations <= burn {
            return Err(ModelError::InvalidArgument(format!(
                "num_iterations ({}) must exceed burn ({})",
                num_iterations, burn
            )));
        }
        if infer_beta && self.use_expert_labels {
            return Err(ModelError::InvalidArgument(
                "cannot infer beta while following expert labels deterministically".into(),
            ));
        }

        for iter in 0..num_iterations {
            let sweep_start = Instant::now();

            self.resample_hyperparameters(rng, infer_beta, infer_alpha_prime);
            self.resample_bkt_parameters(rng);

            if !self.use_expert_labels {
                self.item_order.shuffle(rng);
                let order = self.item_order.clone();
                for &item in &order {
                    self.gibbs_resample_skill(rng, item);
                }
            }

            debug_assert_eq!(
                self.partition
                    .live_handles()
                    .map(|h| self.partition.size(h))
                    .sum::<usize>(),
                self.num_items
            );

            let (train_ll, train_trials) = self.full_data_log_likelihood(true);
            let elapsed_ms = sweep_start.elapsed().as_secs_f64() * 1000.0;
            tracing::info!(
                "sweep {}/{}: beta = {:.4}, skills = {}, train ll = {:.2}, cross entropy = {:.4} ({:.0} ms)",
                iter + 1,
                num_iterations,
                self.beta(),
                self.partition.num_skills(),
                train_ll,
                -train_ll / train_trials.max(1) as f64,
                elapsed_ms
            );
            if !self.test_students.is_empty() {
                let (test_ll, test_trials) = self.full_data_log_likelihood(false);
                tracing::info!(
                    "sweep {}/{}: held-out ll = {:.2}, cross entropy = {:.4}",
                    iter + 1,
                    num_iterations,
                    test_ll,
                    -test_ll / test_trials.max(1) as f64
                );
            }

            if iter >= burn {
                self.record_sample(train_ll);
            }
        }
        Ok(())
    }

    /// Slice-sample `log alpha'` and `log gamma` against the seating
    /// log-probability of the whole partition plus their priors.
    fn resample_hyperparameters<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        infer_beta: bool,
        infer_alpha_prime: bool,
    ) {
        if self.use_expert_labels || (!infer_beta && !infer_alpha_prime) {
            return;
        }

        let mut seating_lp = wcrp::seating_log_prob(
            &self.partition,
            &self.expert_labels,
            self.num_expert_skills,
            self.log_alpha_prime,
            self.log_gamma,
        );

        if infer_alpha_prime {
            let cur = self.log_alpha_prime;
            let (lower, upper) = LOG_ALPHA_PRIME_BOUNDS;
            let partition = &self.partition;
            let expert_labels = &self.expert_labels;
            let num_expert_skills = self.num_expert_skills;
            let log_gamma = self.log_gamma;
            let (accepted, log_density) = slice_sample(
                rng,
                cur,
                seating_lp + wcrp::log_alpha_prime_prior(cur),
                lower,
                upper,
                HYPER_BRACKET_WIDTH,
                |log_alpha_prime| {
                    wcrp::seating_log_prob(
                        partition,
                        expert_labels,
                        num_expert_skills,
                        log_alpha_prime,
                        log_gamma,
                    ) + wcrp::log_alpha_prime_prior(log_alpha_prime)
                },
            );
            self.log_alpha_prime = accepted;
            seating_lp = log_density - wcrp::log_alpha_prime_prior(accepted);
        }

        if infer_beta {
            let cur = self.log_gamma;
            let (lower, upper) = LOG_GAMMA_BOUNDS;
            let partition = &self.partition;
            let expert_labels = &self.expert_labels;
            let num_expert_skills = self.num_expert_skills;
            let log_alpha_prime = self.log_alpha_prime;
            let (accepted, _) = slice_sample(
                rng,
                cur,
                seating_lp + wcrp::log_gamma_prior(cur),
                lower,
                upper,
                HYPER_BRACKET_WIDTH,
                |log_gamma| {
                    wcrp::seating_log_prob(
                        partition,
                        expert_labels,
                        num_expert_skills,
                        log_alpha_prime,
                        log_gamma,
                    ) + wcrp::log_gamma_prior(log_gamma)
                },
            );
            self.log_gamma = accepted;
        }
    }

    /// Slice-sample the four BKT parameters of every live skill, in random
    /// order per skill, against the skill's training-data log-likelihood.
    fn resample_bkt_parameters<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let handles: Vec<SkillHandle> = self.partition.live_handles().collect();
        for handle in handles {
            let items: Vec<ItemId> = (0..self.num_items)
                .filter(|&item| self.partition.seat_of(item) == Some(handle))
                .collect();

            // training students whose data this skill's parameters touch,
            // each with their earliest exposure to any of its items
            let mut students = Vec::new();
            let mut first_exposures = Vec::new();
            for student in 0..self.num_students {
                if !self.train_students.contains(&student) {
                    continue;
                }
                if !items.iter().any(|&item| self.ever_studied[student][item]) {
                    continue;
                }
                let first = items
                    .iter()
                    .map(|&item| self.first_encounter[student][item])
                    .min()
                    .expect("skill has at least one item");
                students.push(student);
                first_exposures.push(first);
            }

            let mut kinds = BktParam::ALL;
            kinds.shuffle(rng);

            let mut cur_ll = bkt::skill_log_likelihood(
                self.partition.trials(handle),
                &self.sequences,
                self.partition.params(handle),
                &students,
                &first_exposures,
            );
            for kind in kinds {
                let base = *self.partition.params(handle);
                let (accepted, log_density) = {
                    let trials = self.partition.trials(handle);
                    let sequences = &self.sequences;
                    slice_sample(
                        rng,
                        base.get(kind),
                        cur_ll,
                        TOL,
                        ONE_MINUS_TOL,
                        BKT_BRACKET_WIDTH,
                        |value| {
                            let mut candidate = base;
                            candidate.set(kind, value);
                            bkt::skill_log_likelihood(
                                trials,
                                sequences,
                                &candidate,
                                &students,
                                &first_exposures,
                            )
                        },
                    )
                };
                self.partition.params_mut(handle).set(kind, accepted);
                cur_ll = log_density;
            }
        }
    }

    /// Resample one item's skill assignment from its full conditional.
    ///
    /// Candidates are every live skill plus `num_subsamples` "new skill"
    /// options priced by the precomputed singleton table; see Neal's
    /// algorithm 8 for the auxiliary-variable construction.
    fn gibbs_resample_skill<R: Rng + ?Sized>(&mut self, rng: &mut R, item: ItemId) {
        let seat = self.partition.seat_of(item).expect("item not seated");
        self.partition.remove(item, seat, &self.item_trials[item]);

        let students = &self.students_who_studied[item];
        let first_exposures = &self.item_first_exposures[item];

        // forward-filter state of every live skill at each affected
        // student's first encounter of the item; reused across candidates
        let start_beliefs: Vec<Vec<f64>> = students
            .iter()
            .zip(first_exposures)
            .map(|(&student, &cutoff)| self.beliefs_at(student, cutoff))
            .collect();

        let handles: Vec<SkillHandle> = self.partition.live_handles().collect();
        let mut log_weights = Vec::with_capacity(handles.len() + self.num_subsamples);
        for &handle in &handles {
            let slot_beliefs: Vec<f64> = start_beliefs
                .iter()
                .map(|beliefs| beliefs[handle.index()])
                .collect();

            self.partition.assign(item, handle, &self.item_trials[item]);
            let with_item = bkt::skill_log_likelihood_from(
                self.partition.trials(handle),
                &self.sequences,
                self.partition.params(handle),
                students,
                first_exposures,
                &slot_beliefs,
            );
            self.partition.remove(item, handle, &self.item_trials[item]);
            let without_item = bkt::skill_log_likelihood_from(
                self.partition.trials(handle),
                &self.sequences,
                self.partition.params(handle),
                students,
                first_exposures,
                &slot_beliefs,
            );

            let concordance = self.partition.expert_concordance(
                item,
                handle,
                &self.expert_labels,
                self.num_expert_skills,
                self.log_gamma.exp(),
                ConcordanceScope::Live,
            );
            let seating = wcrp::log_seated_weight(
                self.partition.size(handle),
                concordance,
                self.log_gamma,
                self.num_expert_skills,
            );
            log_weights.push(seating + with_item - without_item);
        }

        // the new-skill mass is split evenly across the auxiliary draws
        let new_table = wcrp::log_new_table_weight(
            self.log_alpha_prime,
            self.log_gamma,
            self.num_expert_skills,
        ) - (self.num_subsamples as f64).ln();
        for &singleton_lp in &self.singleton_log_lik[item] {
            log_weights.push(new_table + singleton_lp);
        }

        let drawn = wcrp::sample_log_weighted(rng, &log_weights);
        if drawn < handles.len() {
            self.partition
                .assign(item, handles[drawn], &self.item_trials[item]);
        } else {
            let subsample = drawn - handles.len();
            self.partition
                .assign_new(item, self.prior_pool[subsample], &self.item_trials[item]);
        }
    }

    /// Forward-filter one student's mastery beliefs across all live skills
    /// up to (excluding) `end_trial`.
    ///
    /// Returns a dense per-slot belief vector initialized to each skill's
    /// `psi`.
    fn beliefs_at(&self, student: StudentId, end_trial: TrialIndex) -> Vec<f64> {
        let mut beliefs = vec![0.0; self.partition.slot_count()];
        for handle in self.partition.live_handles() {
            beliefs[handle.index()] = self.partition.params(handle).psi;
        }
        for trial in 0..end_trial {
            let (item, correct) = self.sequences[student][trial];
            let handle = self
                .partition
                .seat_of(item)
                .expect("items on earlier trials are seated");
            let params = self.partition.params(handle);
            beliefs[handle.index()] = params.updated_belief(beliefs[handle.index()], correct);
        }
        beliefs
    }

    /// Log-probability of one student's full recall sequence under the
    /// current chain state, plus the number of trials.
    fn data_log_likelihood(&self, student: StudentId) -> (f64, usize) {
        let sequence = &self.sequences[student];
        let mut beliefs = self.beliefs_at(student, 0);
        let mut log_lik = 0.0;
        for &(item, correct) in sequence {
            let handle = self.partition.seat_of(item).expect("item not seated");
            let params = self.partition.params(handle);
            let belief = beliefs[handle.index()];
            let p_recall = params.predicted_recall(belief);
            log_lik += if correct {
                p_recall.ln()
            } else {
                (1.0 - p_recall).ln()
            };
            beliefs[handle.index()] = params.updated_belief(belief, correct);
        }
        assert!(log_lik.is_finite(), "non-finite data log-likelihood");
        (log_lik.min(0.0), sequence.len())
    }

    /// Data log-likelihood summed over training (or held-out) students.
    fn full_data_log_likelihood(&self, training: bool) -> (f64, usize) {
        let mut log_lik = 0.0;
        let mut trials = 0;
        for student in 0..self.num_students {
            if self.train_students.contains(&student) != training {
                continue;
            }
            let (student_ll, n) = self.data_log_likelihood(student);
            log_lik += student_ll;
            trials += n;
        }
        (log_lik, trials)
    }

    /// Record one post-burn-in snapshot: compacted skill labels, training
    /// log-likelihood, and the predicted recall probability of every trial.
    fn record_sample(&mut self, train_ll: f64) {
        self.train_ll_samples.push(train_ll);

        // labels are sample-local: handles are renumbered compactly in item
        // order, so labels are not comparable across samples
        let mut next_label = 0usize;
        let mut slot_labels: Vec<Option<usize>> = vec![None; self.partition.slot_count()];
        let mut labels = Vec::with_capacity(self.num_items);
        for item in 0..self.num_items {
            let handle = self.partition.seat_of(item).expect("item not seated");
            let label = match slot_labels[handle.index()] {
                Some(label) => label,
                None => {
                    let label = next_label;
                    next_label += 1;
                    slot_labels[handle.index()] = Some(label);
                    label
                }
            };
            labels.push(label);
        }
        self.label_samples.push(labels);

        for student in 0..self.num_students {
            let mut beliefs = self.beliefs_at(student, 0);
            for trial in 0..self.sequences[student].len() {
                let (item, correct) = self.sequences[student][trial];
                let handle = self.partition.seat_of(item).expect("item not seated");
                let params = self.partition.params(handle);
                let belief = beliefs[handle.index()];
                self.predicted_recall[student][trial].push(params.predicted_recall(belief));
                beliefs[handle.index()] = params.updated_belief(belief, correct);
            }
        }
    }

    /// Mean posterior-predictive probability that the student answered the
    /// trial correctly, averaged over recorded samples.
    pub fn estimated_recall_probability(&self, student: StudentId, trial: TrialIndex) -> Result<f64> {
        let samples = &self.predicted_recall[student][trial];
        if samples.is_empty() {
            return Err(ModelError::NoSamples);
        }
        Ok(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    /// Skill labels of every recorded sample, one vector per sample.
    ///
    /// Labels are sample-local 0-based ids; a label in one sample has no
    /// relation to the same label in another.
    pub fn sampled_skill_labels(&self) -> &[Vec<usize>] {
        &self.label_samples
    }

    /// Skill labels of the recorded sample with the highest training
    /// log-likelihood.
    pub fn most_likely_skill_labels(&self) -> Result<Vec<usize>> {
        let (best, _) = self
            .train_ll_samples
            .iter()
            .enumerate()
            .max_by_key(|&(_, &ll)| OrderedFloat(ll))
            .ok_or(ModelError::NoSamples)?;
        Ok(self.label_samples[best].clone())
    }

    /// Training log-likelihood of every recorded sample.
    pub fn train_log_likelihoods(&self) -> &[f64] {
        &self.train_ll_samples
    }

    pub fn num_samples(&self) -> usize {
        self.train_ll_samples.len()
    }

    pub fn num_students(&self) -> usize {
        self.num_students
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn num_skills(&self) -> usize {
        self.partition.num_skills()
    }

    pub fn sequence_len(&self, student: StudentId) -> usize {
        self.sequences[student].len()
    }

    pub fn beta(&self) -> f64 {
        1.0 - self.log_gamma.exp()
    }

    pub fn alpha_prime(&self) -> f64 {
        self.log_alpha_prime.exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn fixture_dataset() -> Dataset {
        // 3 students, 4 items, 2 expert skills
        let rows = vec![
            (0, 0, 0, true),
            (0, 1, 0, false),
            (0, 2, 1, true),
            (0, 3, 1, true),
            (0, 0, 0, true),
            (1, 2, 1, false),
            (1, 0, 0, true),
            (1, 3, 1, true),
            (1, 1, 0, false),
            (2, 3, 1, true),
            (2, 2, 1, true),
            (2, 1, 0, false),
            (2, 0, 0, true),
        ];
        Dataset::from_trials(&rows).unwrap()
    }

    fn train_all(dataset: &Dataset) -> AHashSet<usize> {
        (0..dataset.num_students).collect()
    }

    #[test]
    fn test_construction_seats_items_by_expert_label() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let dataset = fixture_dataset();
        let sampler = Sampler::new(
            &mut rng,
            &dataset,
            train_all(&dataset),
            AHashSet::new(),
            1.0,
            Some(1.0),
            0,
        )
        .unwrap();

        assert_eq!(sampler.num_skills(), 2);
        let seat_0 = sampler.partition.seat_of(0);
        let seat_1 = sampler.partition.seat_of(1);
        let seat_2 = sampler.partition.seat_of(2);
        let seat_3 = sampler.partition.seat_of(3);
        assert_eq!(seat_0, seat_1);
        assert_eq!(seat_2, seat_3);
        assert_ne!(seat_0, seat_2);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let dataset = fixture_dataset();

        let result = Sampler::new(
            &mut rng,
            &dataset,
            AHashSet::new(),
            AHashSet::new(),
            0.5,
            Some(1.0),
            10,
        );
        assert!(matches!(result, Err(ModelError::EmptyTrainingSet)));

        let result = Sampler::new(
            &mut rng,
            &dataset,
            train_all(&dataset),
            AHashSet::new(),
            1.5,
            Some(1.0),
            10,
        );
        assert!(matches!(result, Err(ModelError::InvalidArgument(_))));

        let result = Sampler::new(
            &mut rng,
            &dataset,
            train_all(&dataset),
            AHashSet::new(),
            0.5,
            Some(-1.0),
            10,
        );
        assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
    }

    #[test]
    fn test_run_rejects_burn_not_below_iterations() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let dataset = fixture_dataset();
        let mut sampler = Sampler::new(
            &mut rng,
            &dataset,
            train_all(&dataset),
            AHashSet::new(),
            0.0,
            Some(1.0),
            5,
        )
        .unwrap();
        let result = sampler.run(&mut rng, 10, 10, false, false);
        assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
    }

    #[test]
    fn test_query_before_run_fails() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let dataset = fixture_dataset();
        let sampler = Sampler::new(
            &mut rng,
            &dataset,
            train_all(&dataset),
            AHashSet::new(),
            0.0,
            Some(1.0),
            5,
        )
        .unwrap();
        assert!(matches!(
            sampler.estimated_recall_probability(0, 0),
            Err(ModelError::NoSamples)
        ));
        assert!(matches!(
            sampler.most_likely_skill_labels(),
            Err(ModelError::NoSamples)
        ));
    }

    #[test]
    fn test_expert_labels_followed_deterministically() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let dataset = fixture_dataset();
        let mut sampler = Sampler::new(
            &mut rng,
            &dataset,
            train_all(&dataset),
            AHashSet::new(),
            1.0,
            Some(1.0),
            0,
        )
        .unwrap();
        sampler.run(&mut rng, 8, 2, false, false).unwrap();

        // with beta = 1 the arrangement never moves off the expert labels
        assert_eq!(sampler.num_skills(), dataset.num_expert_skills);
        for labels in sampler.sampled_skill_labels() {
            assert_eq!(labels, &dataset.expert_labels);
        }
    }

    #[test]
    fn test_partition_invariants_hold_after_sweeps() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let dataset = fixture_dataset();
        let mut sampler = Sampler::new(
            &mut rng,
            &dataset,
            train_all(&dataset),
            AHashSet::new(),
            0.0,
            Some(1.0),
            10,
        )
        .unwrap();
        sampler.run(&mut rng, 12, 4, false, false).unwrap();

        let total: usize = sampler
            .partition
            .live_handles()
            .map(|h| sampler.partition.size(h))
            .sum();
        assert_eq!(total, dataset.num_items);

        for item in 0..dataset.num_items {
            let handle = sampler.partition.seat_of(item).expect("item seated");
            assert!(sampler.partition.record(handle).is_some());
            let params = sampler.partition.params(handle);
            for kind in BktParam::ALL {
                let v = params.get(kind);
                assert!(v > 0.0 && v < 1.0);
            }
        }
    }

    #[test]
    fn test_recorded_sample_count_and_probability_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dataset = fixture_dataset();
        let mut sampler = Sampler::new(
            &mut rng,
            &dataset,
            train_all(&dataset),
            AHashSet::new(),
            0.0,
            Some(1.0),
            10,
        )
        .unwrap();
        sampler.run(&mut rng, 15, 5, false, false).unwrap();

        assert_eq!(sampler.num_samples(), 10);
        for student in 0..dataset.num_students {
            for trial in 0..sampler.sequence_len(student) {
                let p = sampler.estimated_recall_probability(student, trial).unwrap();
                assert!(p > 0.0 && p < 1.0, "p = {}", p);
            }
        }
    }

    #[test]
    fn test_train_log_likelihoods_finite_and_nonpositive() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let dataset = fixture_dataset();
        let mut sampler = Sampler::new(
            &mut rng,
            &dataset,
            train_all(&dataset),
            AHashSet::new(),
            0.5,
            None,
            10,
        )
        .unwrap();
        sampler.run(&mut rng, 10, 3, true, true).unwrap();

        assert_eq!(sampler.train_log_likelihoods().len(), 7);
        for &ll in sampler.train_log_likelihoods() {
            assert!(ll.is_finite());
            assert!(ll <= 0.0);
        }
        let best = sampler.most_likely_skill_labels().unwrap();
        assert_eq!(best.len(), dataset.num_items);
    }
}
