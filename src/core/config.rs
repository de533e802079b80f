//! Numeric constants for the sampler
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

/// Hard floor/ceiling for probability parameters.
///
/// Every BKT parameter is kept inside `[TOL, 1 - TOL]`. The forward filter
/// divides by predicted-recall probabilities; a parameter at exactly 0 or 1
/// produces degenerate transition or emission probabilities and the filter
/// breaks down.
pub const TOL: f64 = 1e-10;

/// Upper end of the valid probability-parameter range.
pub const ONE_MINUS_TOL: f64 = 1.0 - TOL;

/// Shape of the gamma prior on the new-table rate `alpha'`.
///
/// With shape 1 and scale 1 the prior is Exponential(1): mass concentrated
/// on small rates, so new skills are not minted without likelihood support.
pub const ALPHA_PRIME_SHAPE: f64 = 1.0;

/// Scale of the gamma prior on `alpha'`.
pub const ALPHA_PRIME_SCALE: f64 = 1.0;

/// Slice-sampling bounds for `log alpha'`.
///
/// Wide enough that the posterior mode sits comfortably inside the bracket
/// for any realistic dataset (alpha' between ~5e-5 and ~6e4).
pub const LOG_ALPHA_PRIME_BOUNDS: (f64, f64) = (-10.0, 11.0);

/// Slice-sampling bounds for `log gamma`, where `gamma = 1 - beta`.
///
/// `gamma` lives in (0, 1], so `log gamma` is capped at 0; the lower bound
/// corresponds to following the expert labels almost deterministically.
pub const LOG_GAMMA_BOUNDS: (f64, f64) = (-8.0, 0.0);

/// Initial bracket width for hyperparameter slice updates.
pub const HYPER_BRACKET_WIDTH: f64 = 0.25;

/// Initial bracket width for BKT parameter slice updates: a tenth of the
/// valid range.
pub const BKT_BRACKET_WIDTH: f64 = (ONE_MINUS_TOL - TOL) / 10.0;
