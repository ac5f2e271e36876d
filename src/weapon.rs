//! Weapon profile: one weapon resolved at one engagement distance

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};

/// Everything the engine needs to know about a single engagement.
///
/// `distance` and `target_radius` share a unit (metres in the catalog);
/// only their ratio matters. Build through [`WeaponProfile::new`] or call
/// [`WeaponProfile::validate`] after editing fields directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub health: f64,
    pub damage_per_hit: f64,
    pub rpm: f64,
    pub distance: f64,
    pub target_radius: f64,
    pub precision: f64,
    pub control: f64,
}

impl WeaponProfile {
    pub const DEFAULT_HEALTH: f64 = 100.0;
    pub const DEFAULT_TARGET_RADIUS: f64 = 0.17;

    /// Profile against the default target (100 HP, 0.17 radius).
    pub fn new(damage_per_hit: f64, rpm: f64, distance: f64, precision: f64, control: f64) -> Result<Self> {
        let profile = Self {
            health: Self::DEFAULT_HEALTH,
            damage_per_hit,
            rpm,
            distance,
            target_radius: Self::DEFAULT_TARGET_RADIUS,
            precision,
            control,
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn with_health(mut self, health: f64) -> Result<Self> {
        self.health = health;
        self.validate()?;
        Ok(self)
    }

    pub fn with_target_radius(mut self, target_radius: f64) -> Result<Self> {
        self.target_radius = target_radius;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.damage_per_hit.is_finite() && self.damage_per_hit > 0.0) {
            return Err(SimError::InvalidDamage(self.damage_per_hit));
        }
        if !(self.rpm.is_finite() && self.rpm > 0.0) {
            return Err(SimError::InvalidFireRate(self.rpm));
        }
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(SimError::InvalidDistance(self.distance));
        }
        if !(self.health.is_finite() && self.health > 0.0) {
            return Err(SimError::InvalidHealth(self.health));
        }
        if !(self.target_radius.is_finite() && self.target_radius >= 0.0) {
            return Err(SimError::InvalidTargetRadius(self.target_radius));
        }
        if !self.precision.is_finite() {
            return Err(SimError::option("precision", format!("must be finite, got {}", self.precision)));
        }
        if !self.control.is_finite() {
            return Err(SimError::option("control", format!("must be finite, got {}", self.control)));
        }
        Ok(())
    }

    /// Seconds between consecutive shots.
    #[inline]
    pub fn shot_interval(&self) -> f64 {
        1.0 / (self.rpm / 60.0)
    }

    /// Hits needed to deplete the health pool.
    #[inline]
    pub fn hits_to_kill(&self) -> u32 {
        ((self.health / self.damage_per_hit).ceil() as u32).max(1)
    }

    /// Time to kill at 100% accuracy. The first shot lands at t=0.
    pub fn theoretical_ttk(&self) -> f64 {
        (self.hits_to_kill() - 1) as f64 * self.shot_interval()
    }

    /// Angular radius of the target (radians, small-angle approximation).
    #[inline]
    pub fn angular_radius(&self, distance_epsilon: f64) -> f64 {
        self.target_radius / self.distance.max(distance_epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rifle() -> WeaponProfile {
        WeaponProfile::new(25.0, 600.0, 30.0, 50.0, 40.0).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let p = rifle();
        assert_eq!(p.health, 100.0);
        assert_eq!(p.target_radius, 0.17);
    }

    #[test]
    fn test_shot_interval_and_hits() {
        let p = rifle();
        assert!((p.shot_interval() - 0.1).abs() < 1e-15);
        assert_eq!(p.hits_to_kill(), 4);
        assert!((p.theoretical_ttk() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_hits_to_kill_rounds_up() {
        let p = WeaponProfile::new(30.0, 600.0, 10.0, 50.0, 40.0).unwrap();
        assert_eq!(p.hits_to_kill(), 4);
        let one_shot = p.with_health(20.0).unwrap();
        assert_eq!(one_shot.hits_to_kill(), 1);
        assert_eq!(one_shot.theoretical_ttk(), 0.0);
    }

    #[test]
    fn test_rejects_bad_damage() {
        assert!(matches!(
            WeaponProfile::new(0.0, 600.0, 10.0, 50.0, 40.0),
            Err(SimError::InvalidDamage(_))
        ));
        assert!(matches!(
            WeaponProfile::new(-5.0, 600.0, 10.0, 50.0, 40.0),
            Err(SimError::InvalidDamage(_))
        ));
        assert!(matches!(
            WeaponProfile::new(f64::NAN, 600.0, 10.0, 50.0, 40.0),
            Err(SimError::InvalidDamage(_))
        ));
    }

    #[test]
    fn test_rejects_bad_rpm_and_distance() {
        assert!(matches!(
            WeaponProfile::new(20.0, 0.0, 10.0, 50.0, 40.0),
            Err(SimError::InvalidFireRate(_))
        ));
        assert!(matches!(
            WeaponProfile::new(20.0, 600.0, 0.0, 50.0, 40.0),
            Err(SimError::InvalidDistance(_))
        ));
        assert!(matches!(
            WeaponProfile::new(20.0, 600.0, f64::INFINITY, 50.0, 40.0),
            Err(SimError::InvalidDistance(_))
        ));
    }

    #[test]
    fn test_rejects_bad_target() {
        let p = rifle();
        assert!(matches!(p.with_health(0.0), Err(SimError::InvalidHealth(_))));
        assert!(matches!(p.with_target_radius(-0.1), Err(SimError::InvalidTargetRadius(_))));
        assert!(p.with_target_radius(0.0).is_ok());
    }

    #[test]
    fn test_angular_radius_floors_distance() {
        let mut p = rifle().with_target_radius(0.25).unwrap();
        assert!((p.angular_radius(1e-9) - 0.25 / 30.0).abs() < 1e-15);
        // Fields are public; the floor still keeps the ratio finite.
        p.distance = 0.0;
        assert!(p.angular_radius(1e-9).is_finite());
    }
}
