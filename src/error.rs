//! Error types for profile validation and catalog loading

use thiserror::Error;

/// Everything that can go wrong before a simulation starts.
///
/// A duel that runs out of shots, or an evaluation where no trial
/// scores a kill, is a normal result and never shows up here.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("damage per hit must be a positive finite number, got {0}")]
    InvalidDamage(f64),

    #[error("rate of fire must be a positive finite number of rounds/minute, got {0}")]
    InvalidFireRate(f64),

    #[error("engagement distance must be a positive finite number, got {0}")]
    InvalidDistance(f64),

    #[error("target health must be a positive finite number, got {0}")]
    InvalidHealth(f64),

    #[error("target radius must be a non-negative finite number, got {0}")]
    InvalidTargetRadius(f64),

    #[error("player skill jitter must be a non-negative finite number of degrees, got {0}")]
    InvalidSkill(f64),

    #[error("invalid option `{name}`: {reason}")]
    InvalidOption { name: &'static str, reason: String },

    #[error("unknown weapon `{0}`")]
    UnknownWeapon(String),

    #[error("weapon `{weapon}` has no damage entry for distance {distance}")]
    UnknownDistance { weapon: String, distance: f64 },

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    pub(crate) fn option(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidOption {
            name,
            reason: reason.into(),
        }
    }
}
