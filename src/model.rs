//! Stat-to-parameter mapping
//!
//! Raw catalog ratings (precision, control) and the player's aim jitter are
//! turned into angular model quantities here. All tuning lives in
//! [`ModelConstants`]; nothing in this module reads global state.
//!
//! Inputs on the constants struct are in degrees. Everything that leaves
//! this module is in radians.

use crate::error::{Result, SimError};
use crate::weapon::WeaponProfile;
use serde::{Deserialize, Serialize};

/// Tuning constants for the spread, drift and cap model.
///
/// Every field has a default; YAML/JSON overrides may set any subset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConstants {
    /// Inherent weapon spread, independent of ratings (deg).
    pub base_spread_deg: f64,

    pub precision_min: f64,
    pub precision_max: f64,
    /// Bloom at the best precision rating (deg).
    pub bloom_best_deg: f64,
    /// Bloom at the worst precision rating (deg).
    pub bloom_worst_deg: f64,

    pub control_min: f64,
    pub control_max: f64,
    /// Per-shot drift step at the best control rating (deg).
    pub drift_best_deg: f64,
    /// Per-shot drift step at the worst control rating (deg).
    pub drift_worst_deg: f64,

    /// Jitter at which compensation reaches zero (deg).
    pub skill_reference_deg: f64,
    /// Compensation ceiling; must stay below 1.
    pub alpha_max: f64,

    /// Centering pull between shots (1/s).
    pub recovery_rate: f64,
    /// Horizontal wobble as a fraction of the vertical drift step.
    pub wobble_fraction: f64,

    // Drift cap: absolute floor (deg) and multiple of target angular radius,
    // each interpolated between worst and best by the alpha/control blend.
    pub cap_abs_best_deg: f64,
    pub cap_abs_worst_deg: f64,
    pub cap_rel_best: f64,
    pub cap_rel_worst: f64,
    /// Lognormal relative sigma of the cap at control 0.
    pub cap_sigma_worst: f64,
    /// Lognormal relative sigma of the cap at control 1.
    pub cap_sigma_best: f64,
    pub cap_mult_min: f64,
    pub cap_mult_max: f64,

    /// Distances are floored at this before dividing.
    pub distance_epsilon: f64,
}

impl Default for ModelConstants {
    fn default() -> Self {
        Self {
            base_spread_deg: 0.06,
            precision_min: 20.0,
            precision_max: 76.0,
            bloom_best_deg: 0.12,
            bloom_worst_deg: 0.15,
            control_min: 8.0,
            control_max: 65.0,
            drift_best_deg: 0.05,
            drift_worst_deg: 0.16,
            skill_reference_deg: 0.30,
            alpha_max: 0.98,
            recovery_rate: 4.0,
            wobble_fraction: 0.10,
            cap_abs_best_deg: 0.03,
            cap_abs_worst_deg: 0.25,
            cap_rel_best: 0.9,
            cap_rel_worst: 1.6,
            cap_sigma_worst: 0.20,
            cap_sigma_best: 0.05,
            cap_mult_min: 0.7,
            cap_mult_max: 1.5,
            distance_epsilon: 1e-9,
        }
    }
}

impl ModelConstants {
    pub fn validate(&self) -> Result<()> {
        let all_finite = [
            self.base_spread_deg,
            self.precision_min,
            self.precision_max,
            self.bloom_best_deg,
            self.bloom_worst_deg,
            self.control_min,
            self.control_max,
            self.drift_best_deg,
            self.drift_worst_deg,
            self.skill_reference_deg,
            self.alpha_max,
            self.recovery_rate,
            self.wobble_fraction,
            self.cap_abs_best_deg,
            self.cap_abs_worst_deg,
            self.cap_rel_best,
            self.cap_rel_worst,
            self.cap_sigma_worst,
            self.cap_sigma_best,
            self.cap_mult_min,
            self.cap_mult_max,
            self.distance_epsilon,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !all_finite {
            return Err(SimError::option("constants", "all model constants must be finite"));
        }
        if !(0.0..1.0).contains(&self.alpha_max) {
            return Err(SimError::option(
                "alpha_max",
                format!("must lie in [0, 1), got {}", self.alpha_max),
            ));
        }
        if self.skill_reference_deg <= 0.0 {
            return Err(SimError::option("skill_reference_deg", "must be positive"));
        }
        if self.recovery_rate < 0.0 {
            return Err(SimError::option("recovery_rate", "must be non-negative"));
        }
        if !(0.0 < self.cap_mult_min && self.cap_mult_min <= self.cap_mult_max) {
            return Err(SimError::option(
                "cap_mult_min",
                format!(
                    "need 0 < cap_mult_min <= cap_mult_max, got {} and {}",
                    self.cap_mult_min, self.cap_mult_max
                ),
            ));
        }
        if self.distance_epsilon <= 0.0 {
            return Err(SimError::option("distance_epsilon", "must be positive"));
        }
        let non_negative = [
            ("base_spread_deg", self.base_spread_deg),
            ("bloom_best_deg", self.bloom_best_deg),
            ("bloom_worst_deg", self.bloom_worst_deg),
            ("drift_best_deg", self.drift_best_deg),
            ("drift_worst_deg", self.drift_worst_deg),
            ("wobble_fraction", self.wobble_fraction),
            ("cap_abs_best_deg", self.cap_abs_best_deg),
            ("cap_abs_worst_deg", self.cap_abs_worst_deg),
            ("cap_rel_best", self.cap_rel_best),
            ("cap_rel_worst", self.cap_rel_worst),
            ("cap_sigma_worst", self.cap_sigma_worst),
            ("cap_sigma_best", self.cap_sigma_best),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(SimError::option(name, format!("must be non-negative, got {value}")));
            }
        }
        Ok(())
    }

    /// Base spread σ0 (rad).
    pub fn base_spread(&self) -> f64 {
        self.base_spread_deg.to_radians()
    }

    /// Precision rating → bloom (rad). Higher precision, tighter bloom.
    pub fn bloom_for_precision(&self, precision: f64) -> f64 {
        let p = normalize(precision, self.precision_min, self.precision_max);
        let deg = self.bloom_best_deg + (1.0 - p) * (self.bloom_worst_deg - self.bloom_best_deg);
        deg.to_radians()
    }

    /// Control rating → deterministic drift step (rad/shot).
    pub fn drift_for_control(&self, control: f64) -> f64 {
        let c = self.control_norm(control);
        let deg = self.drift_best_deg + (1.0 - c) * (self.drift_worst_deg - self.drift_best_deg);
        deg.to_radians()
    }

    pub fn control_norm(&self, control: f64) -> f64 {
        normalize(control, self.control_min, self.control_max)
    }

    /// Player jitter (deg) → compensation fraction α in [0, alpha_max].
    pub fn alpha_from_skill(&self, skill_deg: f64) -> f64 {
        let ratio = skill_deg / self.skill_reference_deg;
        (1.0 - ratio * ratio).clamp(0.0, self.alpha_max)
    }
}

/// Map `value` onto [0, 1] relative to `[min, max]`, clamped.
/// A degenerate range maps everything to 0.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Derived physical quantities for one (profile, skill) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelParameters {
    /// Base spread σ0 (rad).
    pub base_spread: f64,
    /// Precision bloom (rad).
    pub bloom: f64,
    /// Vertical drift per shot (rad).
    pub drift_step: f64,
    /// Player aim jitter σ_player (rad).
    pub player_jitter: f64,
    /// Compensation fraction α.
    pub alpha: f64,
    /// Normalized control c.
    pub control_norm: f64,
    /// Target angular radius R/d (rad).
    pub target_angle: f64,
    /// Seconds between shots.
    pub shot_interval: f64,
    pub hits_to_kill: u32,
}

impl ModelParameters {
    /// Derive from an already-validated profile.
    pub fn derive(profile: &WeaponProfile, skill_deg: f64, constants: &ModelConstants) -> Self {
        Self {
            base_spread: constants.base_spread(),
            bloom: constants.bloom_for_precision(profile.precision),
            drift_step: constants.drift_for_control(profile.control),
            player_jitter: skill_deg.to_radians(),
            alpha: constants.alpha_from_skill(skill_deg),
            control_norm: constants.control_norm(profile.control),
            target_angle: profile.angular_radius(constants.distance_epsilon),
            shot_interval: profile.shot_interval(),
            hits_to_kill: profile.hits_to_kill(),
        }
    }

    /// Per-shot angular sigma: quadrature sum of base spread, bloom and jitter.
    #[inline]
    pub fn total_spread(&self) -> f64 {
        crate::aim::total_spread(self.base_spread, self.bloom, self.player_jitter)
    }
}

pub(crate) fn validate_skill(skill_deg: f64) -> Result<()> {
    if skill_deg.is_finite() && skill_deg >= 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidSkill(skill_deg))
    }
}
