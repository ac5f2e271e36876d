//! Aim geometry: per-shot hit probability and recoil drift
//!
//! The aim point is modelled as a 2-D Gaussian around a mean offset. The
//! mean offset walks away from centre with every shot (recoil), is pulled
//! back between shots (recovery), and is held inside a skill-dependent
//! stochastic cap.

use crate::model::{ModelConstants, ModelParameters};
use crate::rng::SimRng;
use glam::DVec2;

/// Combined per-shot angular sigma (rad).
///
/// Bloom is a per-shot term, not cumulative; growth over a burst is carried
/// by the drift of the mean offset instead.
#[inline]
pub fn total_spread(base_spread: f64, bloom: f64, player_jitter: f64) -> f64 {
    (base_spread * base_spread + bloom * bloom + player_jitter * player_jitter).sqrt()
}

/// Probability that one shot lands inside a circle of `target_angle` radius.
///
/// With `sigma <= 0` the shot goes exactly where the mean points and the
/// answer is 0 or 1. Otherwise it is a Monte Carlo estimate over
/// `sample_count` isotropic Gaussian offsets around `mean_offset`.
pub fn estimate_hit_probability(
    mean_offset: DVec2,
    sigma: f64,
    target_angle: f64,
    sample_count: u32,
    rng: &mut SimRng,
) -> f64 {
    let radius_sq = target_angle * target_angle;
    if sigma <= 0.0 {
        return if mean_offset.length_squared() <= radius_sq { 1.0 } else { 0.0 };
    }
    if sample_count == 0 {
        return 0.0;
    }
    let mut inside = 0u32;
    for _ in 0..sample_count {
        let x = mean_offset.x + sigma * rng.next_gaussian();
        let y = mean_offset.y + sigma * rng.next_gaussian();
        if x * x + y * y <= radius_sq {
            inside += 1;
        }
    }
    inside as f64 / sample_count as f64
}

/// Recoil impulse for one shot: full vertical step plus a uniform
/// horizontal wobble of up to `wobble_fraction` of that step.
#[inline]
pub fn recoil_impulse(drift_step: f64, wobble_fraction: f64, rng: &mut SimRng) -> DVec2 {
    let yaw = (rng.next_uniform() - 0.5) * (2.0 * wobble_fraction);
    DVec2::new(drift_step * yaw, drift_step)
}

/// Mean drift cap (rad): the larger of an absolute floor and a multiple of
/// the target's angular radius, both tightening as the alpha/control blend
/// improves.
pub fn mean_drift_cap(alpha: f64, control_norm: f64, target_angle: f64, constants: &ModelConstants) -> f64 {
    let mix = 0.5 * alpha + 0.5 * control_norm;

    let abs_deg = constants.cap_abs_worst_deg - mix * (constants.cap_abs_worst_deg - constants.cap_abs_best_deg);
    let rel = constants.cap_rel_worst - mix * (constants.cap_rel_worst - constants.cap_rel_best);

    abs_deg.to_radians().max(rel * target_angle)
}

/// Per-shot cap: `mean_cap` times a clamped lognormal factor whose spread
/// shrinks with control.
pub fn stochastic_cap(mean_cap: f64, control_norm: f64, constants: &ModelConstants, rng: &mut SimRng) -> f64 {
    let rel_sigma =
        constants.cap_sigma_worst - (constants.cap_sigma_worst - constants.cap_sigma_best) * control_norm;
    let mult = (rel_sigma * rng.next_gaussian()).exp();
    mean_cap * mult.clamp(constants.cap_mult_min, constants.cap_mult_max)
}

/// Mean aim offset of one in-flight duel. Starts at the origin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AimState {
    mean_offset: DVec2,
}

impl AimState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mean_offset(&self) -> DVec2 {
        self.mean_offset
    }

    pub fn reset(&mut self) {
        self.mean_offset = DVec2::ZERO;
    }

    /// Decay the current offset toward centre over `dt`, then add the part
    /// of `impulse` the player failed to compensate.
    pub fn apply_feedback(&mut self, impulse: DVec2, alpha: f64, dt: f64, recovery_rate: f64) {
        let keep = (-recovery_rate * dt).exp();
        self.mean_offset = self.mean_offset * keep + impulse * (1.0 - alpha);
    }

    /// Radially rescale the offset onto `cap` if it lies outside it.
    pub fn clamp_to(&mut self, cap: f64) {
        let magnitude = self.mean_offset.length();
        if magnitude > cap {
            self.mean_offset *= cap / magnitude;
        }
    }

    /// Full between-shot update: impulse, feedback, stochastic cap, clamp.
    pub fn advance(&mut self, params: &ModelParameters, constants: &ModelConstants, rng: &mut SimRng) {
        let impulse = recoil_impulse(params.drift_step, constants.wobble_fraction, rng);
        self.apply_feedback(impulse, params.alpha, params.shot_interval, constants.recovery_rate);

        let mean_cap = mean_drift_cap(params.alpha, params.control_norm, params.target_angle, constants);
        let cap = stochastic_cap(mean_cap, params.control_norm, constants, rng);
        self.clamp_to(cap);
    }
}
