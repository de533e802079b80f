//! Univariate slice sampling with stepping-out and shrinkage
//!
//! One routine serves both the per-skill BKT parameter updates and the WCRP
//! hyperparameter updates; callers supply the target log-density as a
//! closure. See Neal (2003), "Slice sampling".

use rand::Rng;

/// Draw a new value for a univariate parameter by slice sampling.
///
/// `cur_log_density` must be the target log-density evaluated at `cur`; the
/// slice level is drawn beneath it. The bracket starts with width `width`
/// placed uniformly at random around `cur`, is stepped outward while the
/// target at its edges stays above the slice level (never beyond
/// `[lower, upper]`), and then shrinks toward `cur` around rejected draws.
///
/// Returns the accepted value and its log-density, so chained updates can
/// avoid re-evaluating the target. There is no iteration cap: termination
/// relies on the bracket containing the mode under a unimodal conditional.
pub fn slice_sample<R, F>(
    rng: &mut R,
    cur: f64,
    cur_log_density: f64,
    lower: f64,
    upper: f64,
    width: f64,
    mut log_density: F,
) -> (f64, f64)
where
    R: Rng + ?Sized,
    F: FnMut(f64) -> f64,
{
    let level = cur_log_density + rng.gen::<f64>().ln();

    // place the initial bracket uniformly around the current value
    let split = rng.gen::<f64>();
    let mut left = (cur - split * width).max(lower);
    let mut right = (cur + (1.0 - split) * width).min(upper);

    // step out
    while left >= lower && log_density(left) > level {
        left -= width;
    }
    left = left.max(lower);
    while right <= upper && log_density(right) > level {
        right += width;
    }
    right = right.min(upper);

    // shrink until a draw lands above the slice level
    loop {
        let proposal = left + (right - left) * rng.gen::<f64>();
        let proposal_log_density = log_density(proposal);
        if proposal_log_density > level {
            return (proposal, proposal_log_density);
        }
        if proposal > cur {
            right = proposal;
        } else if proposal < cur {
            left = proposal;
        } else {
            // bracket shrunk to the current point
            return (proposal, proposal_log_density);
        }
    }
}
