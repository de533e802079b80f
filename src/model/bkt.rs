//! Bayesian Knowledge Tracing: parameters and the forward-filter likelihood
//!
//! BKT models a student's knowledge of one skill as a two-state HMM
//! (unmastered/mastered). The belief `p` that the student has mastered the
//! skill starts at `psi`, each trial emits a correct response with
//! probability `pi0 * (1 - p) + pi1 * p`, and after every trial the belief
//! is updated by Bayes' rule and advanced by the learning transition `mu`.

use ahash::AHashMap;
use rand::Rng;

use crate::core::config::{ONE_MINUS_TOL, TOL};
use crate::core::types::{ItemId, StudentId, TrialIndex};

/// The BKT parameter tuple for one skill
///
/// `pi0` (probability of a correct response while unmastered) is stored as
/// the proportion `prop0` of `pi1`, which keeps `pi0 <= pi1` by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BktParams {
    /// Prior probability of initial mastery
    pub psi: f64,
    /// Probability of transitioning unmastered -> mastered after a trial
    pub mu: f64,
    /// P(correct | mastered)
    pub pi1: f64,
    /// pi0 as a proportion of pi1
    pub prop0: f64,
}

/// Which scalar of the tuple a univariate update targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BktParam {
    Psi,
    Mu,
    Pi1,
    Prop0,
}

impl BktParam {
    pub const ALL: [BktParam; 4] = [BktParam::Psi, BktParam::Mu, BktParam::Pi1, BktParam::Prop0];
}

impl BktParams {
    /// Draw each parameter uniformly on `[TOL, 1 - TOL]`.
    ///
    /// The filter breaks down if any parameter is exactly 0 or 1.
    pub fn draw_prior<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut draw = || TOL + (ONE_MINUS_TOL - TOL) * rng.gen::<f64>();
        Self {
            psi: draw(),
            mu: draw(),
            pi1: draw(),
            prop0: draw(),
        }
    }

    pub fn get(&self, param: BktParam) -> f64 {
        match param {
            BktParam::Psi => self.psi,
            BktParam::Mu => self.mu,
            BktParam::Pi1 => self.pi1,
            BktParam::Prop0 => self.prop0,
        }
    }

    pub fn set(&mut self, param: BktParam, value: f64) {
        match param {
            BktParam::Psi => self.psi = value,
            BktParam::Mu => self.mu = value,
            BktParam::Pi1 => self.pi1 = value,
            BktParam::Prop0 => self.prop0 = value,
        }
    }

    /// P(correct | unmastered)
    pub fn pi0(&self) -> f64 {
        self.pi1 * self.prop0
    }

    /// Probability of a correct response given the current mastery belief.
    pub fn predicted_recall(&self, belief: f64) -> f64 {
        self.pi0() * (1.0 - belief) + self.pi1 * belief
    }

    /// Posterior mastery belief after observing one outcome, advanced by the
    /// learning transition.
    pub fn updated_belief(&self, belief: f64, correct: bool) -> f64 {
        let pi0 = self.pi0();
        let q = 1.0 - belief;
        if correct {
            (self.pi1 * belief + self.mu * pi0 * q) / (self.pi1 * belief + pi0 * q)
        } else {
            ((1.0 - self.pi1) * belief + self.mu * (1.0 - pi0) * q)
                / ((1.0 - self.pi1) * belief + (1.0 - pi0) * q)
        }
    }
}

/// Log-probability of the observed outcomes on one skill's trials.
///
/// `trials` maps each student to the sorted trial indices attributed to the
/// skill; `students` and `first_exposures` are aligned. Each student's
/// belief starts at `psi` and replays their full trial list, but only trials
/// at or past the student's cutoff contribute to the total; earlier trials
/// advance the belief without counting.
///
/// Parameters are passed explicitly so slice sampling can evaluate candidate
/// values without committing them to the partition.
pub fn skill_log_likelihood(
    trials: &AHashMap<StudentId, Vec<TrialIndex>>,
    sequences: &[Vec<(ItemId, bool)>],
    params: &BktParams,
    students: &[StudentId],
    first_exposures: &[TrialIndex],
) -> f64 {
    let mut total = 0.0;
    for (&student, &start_trial) in students.iter().zip(first_exposures) {
        let Some(trial_indices) = trials.get(&student) else {
            continue;
        };
        let sequence = &sequences[student];
        let mut belief = params.psi;
        let mut student_ll = 0.0;
        for &trial in trial_indices {
            let (_, correct) = sequence[trial];
            if trial >= start_trial {
                let p_recall = params.predicted_recall(belief);
                student_ll += if correct { p_recall.ln() } else { (1.0 - p_recall).ln() };
            }
            belief = params.updated_belief(belief, correct);
        }
        assert!(student_ll.is_finite(), "non-finite skill log-likelihood");
        total += student_ll.min(0.0);
    }
    assert!(total.is_finite(), "non-finite skill log-likelihood");
    total.min(0.0)
}

/// Like [`skill_log_likelihood`], but each student's belief starts from a
/// precomputed forward-filter state at their cutoff trial, and trials before
/// the cutoff are skipped outright.
///
/// `start_beliefs` is aligned with `students`. This lets repeated
/// evaluations during a single Gibbs step reuse forward state instead of
/// replaying every sequence from trial zero. The cache can leave a summed
/// log-likelihood marginally above zero; that overshoot is clamped.
pub fn skill_log_likelihood_from(
    trials: &AHashMap<StudentId, Vec<TrialIndex>>,
    sequences: &[Vec<(ItemId, bool)>],
    params: &BktParams,
    students: &[StudentId],
    first_exposures: &[TrialIndex],
    start_beliefs: &[f64],
) -> f64 {
    let mut total = 0.0;
    for ((&student, &start_trial), &start_belief) in
        students.iter().zip(first_exposures).zip(start_beliefs)
    {
        let Some(trial_indices) = trials.get(&student) else {
            // the student lost their only trials for this skill
            continue;
        };
        let sequence = &sequences[student];
        let mut belief = start_belief;
        let mut student_ll = 0.0;
        for &trial in trial_indices {
            if trial < start_trial {
                continue;
            }
            let (_, correct) = sequence[trial];
            let p_recall = params.predicted_recall(belief);
            student_ll += if correct { p_recall.ln() } else { (1.0 - p_recall).ln() };
            belief = params.updated_belief(belief, correct);
        }
        assert!(student_ll.is_finite(), "non-finite skill log-likelihood");
        total += student_ll.min(0.0);
    }
    assert!(total.is_finite(), "non-finite skill log-likelihood");
    total
}
