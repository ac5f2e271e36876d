//! Stochastic time-to-kill simulator
//!
//! Converts weapon ratings and a player skill value into an aim model, plays
//! out duels shot by shot, and aggregates many duels into expected TTK,
//! kill probability within a time window and accuracy.
//!
//! ```no_run
//! use ttk_sim::{evaluate, EvalOptions, ModelConstants, WeaponProfile};
//!
//! let profile = WeaponProfile::new(20.0, 750.0, 50.0, 60.0, 50.0)?
//!     .with_target_radius(0.25)?;
//! let options = EvalOptions { trials: 500, ..EvalOptions::default() }.with_seed(42);
//! let result = evaluate(&profile, 0.10, &options, &ModelConstants::default())?;
//! println!("ETTK {:.3}s, accuracy {:.1}%", result.expected_ttk, result.accuracy * 100.0);
//! # Ok::<(), ttk_sim::SimError>(())
//! ```

pub mod aim;
pub mod config;
pub mod error;
pub mod model;
pub mod rng;
pub mod simulation;
pub mod stats;
pub mod weapon;

#[cfg(feature = "python")]
pub mod python;

pub use config::{RunConfig, TargetSpec, WeaponCatalog, WeaponSpec};
pub use error::{Result, SimError};
pub use model::{ModelConstants, ModelParameters};
pub use rng::{hash_seed, seed_key, SimRng};
pub use simulation::{
    evaluate, evaluate_catalog, evaluate_weapon, evaluate_with_rng, simulate_one_duel, simulate_trials, EvalOptions,
};
pub use stats::{best_by_distance, DuelOutcome, EvaluationResult, Metric, WeaponReport};
pub use weapon::WeaponProfile;
