//! Duel simulation and batch evaluation
//!
//! A duel fires shots at fixed `60/RPM` spacing until the target's health
//! is gone or the shot budget runs out. An evaluation runs many duels off
//! one continuously advancing RNG stream, so a seed pins down the whole
//! trial sequence. Parallelism is only ever applied across independent
//! evaluations, each owning its own stream.

use crate::aim::{estimate_hit_probability, AimState};
use crate::config::{RunConfig, WeaponCatalog, WeaponSpec};
use crate::error::{Result, SimError};
use crate::model::{validate_skill, ModelConstants, ModelParameters};
use crate::rng::{seed_key, SimRng};
use crate::stats::{DistanceRow, DuelOutcome, EvaluationResult, WeaponReport};
use crate::weapon::WeaponProfile;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Knobs for one evaluation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    /// Independent duels per evaluation.
    pub trials: u32,
    /// Window for Kill@W and AUC@W (s).
    pub kill_window: f64,
    /// Shot budget per duel.
    pub max_shots: u32,
    /// Monte Carlo samples per hit-probability estimate.
    pub sample_count: u32,
    /// Fixed seed. `None` derives one per evaluation key (catalog runs)
    /// or from entropy (single calls).
    pub seed: Option<u32>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            trials: 100,
            kill_window: 1.0,
            max_shots: 50,
            sample_count: 800,
            seed: None,
        }
    }
}

impl EvalOptions {
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(SimError::option("trials", "must be at least 1"));
        }
        if self.max_shots == 0 {
            return Err(SimError::option("max_shots", "must be at least 1"));
        }
        if self.sample_count == 0 {
            return Err(SimError::option("sample_count", "must be at least 1"));
        }
        if !(self.kill_window.is_finite() && self.kill_window > 0.0) {
            return Err(SimError::option(
                "kill_window",
                format!("must be a positive number of seconds, got {}", self.kill_window),
            ));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    /// RNG for a single evaluation call.
    pub fn rng(&self) -> SimRng {
        match self.seed {
            Some(seed) => SimRng::new(seed),
            None => SimRng::from_entropy(),
        }
    }

    /// RNG for one cell of a catalog run: the fixed seed if set,
    /// otherwise a stream derived from `key`.
    pub fn rng_for_key(&self, key: &str) -> SimRng {
        match self.seed {
            Some(seed) => SimRng::new(seed),
            None => SimRng::from_key(key),
        }
    }
}

/// Where a duel currently stands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DuelState {
    Firing,
    Killed(DuelOutcome),
    Exhausted,
}

/// One engagement, stepped a shot at a time.
#[derive(Debug, Clone)]
pub struct Duel<'a> {
    params: &'a ModelParameters,
    constants: &'a ModelConstants,
    max_shots: u32,
    sample_count: u32,
    sigma: f64,
    aim: AimState,
    shots_fired: u32,
    hits: u32,
    state: DuelState,
}

impl<'a> Duel<'a> {
    pub fn new(params: &'a ModelParameters, constants: &'a ModelConstants, max_shots: u32, sample_count: u32) -> Self {
        Self {
            params,
            constants,
            max_shots,
            sample_count,
            sigma: params.total_spread(),
            aim: AimState::new(),
            shots_fired: 0,
            hits: 0,
            state: if max_shots == 0 { DuelState::Exhausted } else { DuelState::Firing },
        }
    }

    pub fn state(&self) -> DuelState {
        self.state
    }

    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    pub fn aim(&self) -> &AimState {
        &self.aim
    }

    /// Fire the next shot. Terminal states are sticky.
    pub fn fire(&mut self, rng: &mut SimRng) -> DuelState {
        if self.state != DuelState::Firing {
            return self.state;
        }
        self.shots_fired += 1;
        let shot = self.shots_fired;

        let p = estimate_hit_probability(
            self.aim.mean_offset(),
            self.sigma,
            self.params.target_angle,
            self.sample_count,
            rng,
        );
        if rng.next_uniform() < p {
            self.hits += 1;
            if self.hits >= self.params.hits_to_kill {
                self.state = DuelState::Killed(DuelOutcome {
                    ttk: (shot - 1) as f64 * self.params.shot_interval,
                    shots: shot,
                    hits: self.hits,
                    misses: shot - self.hits,
                });
                return self.state;
            }
        }

        // Recoil settles after every non-lethal shot, including the last
        // one, so the stream position is independent of the shot budget.
        self.aim.advance(self.params, self.constants, rng);

        if shot >= self.max_shots {
            self.state = DuelState::Exhausted;
        }
        self.state
    }

    /// Fire until the duel ends.
    pub fn run(mut self, rng: &mut SimRng) -> Option<DuelOutcome> {
        loop {
            match self.fire(rng) {
                DuelState::Firing => continue,
                DuelState::Killed(outcome) => return Some(outcome),
                DuelState::Exhausted => return None,
            }
        }
    }
}

/// Simulate one duel from derived parameters.
#[inline]
pub fn simulate_duel(
    params: &ModelParameters,
    constants: &ModelConstants,
    max_shots: u32,
    sample_count: u32,
    rng: &mut SimRng,
) -> Option<DuelOutcome> {
    Duel::new(params, constants, max_shots, sample_count).run(rng)
}

/// Simulate one duel with default constants and limits.
/// `Ok(None)` means the shot budget ran out without a kill.
pub fn simulate_one_duel(profile: &WeaponProfile, skill_deg: f64, rng: &mut SimRng) -> Result<Option<DuelOutcome>> {
    let constants = ModelConstants::default();
    let options = EvalOptions::default();
    check_inputs(profile, skill_deg, &options, &constants)?;
    let params = ModelParameters::derive(profile, skill_deg, &constants);
    Ok(simulate_duel(&params, &constants, options.max_shots, options.sample_count, rng))
}

fn check_inputs(
    profile: &WeaponProfile,
    skill_deg: f64,
    options: &EvalOptions,
    constants: &ModelConstants,
) -> Result<()> {
    profile.validate()?;
    validate_skill(skill_deg)?;
    options.validate()?;
    constants.validate()
}

/// Raw outcomes of `options.trials` duels drawn from `rng` in order.
pub fn simulate_trials_with_rng(
    profile: &WeaponProfile,
    skill_deg: f64,
    options: &EvalOptions,
    constants: &ModelConstants,
    rng: &mut SimRng,
) -> Result<Vec<Option<DuelOutcome>>> {
    check_inputs(profile, skill_deg, options, constants)?;
    let params = ModelParameters::derive(profile, skill_deg, constants);
    Ok((0..options.trials)
        .map(|_| simulate_duel(&params, constants, options.max_shots, options.sample_count, rng))
        .collect())
}

/// Raw outcomes of `options.trials` duels, seeded from `options`.
pub fn simulate_trials(
    profile: &WeaponProfile,
    skill_deg: f64,
    options: &EvalOptions,
    constants: &ModelConstants,
) -> Result<Vec<Option<DuelOutcome>>> {
    let mut rng = options.rng();
    simulate_trials_with_rng(profile, skill_deg, options, constants, &mut rng)
}

/// Evaluate one (profile, skill) pair on a caller-supplied stream.
pub fn evaluate_with_rng(
    profile: &WeaponProfile,
    skill_deg: f64,
    options: &EvalOptions,
    constants: &ModelConstants,
    rng: &mut SimRng,
) -> Result<EvaluationResult> {
    let outcomes = simulate_trials_with_rng(profile, skill_deg, options, constants, rng)?;
    let result = EvaluationResult::from_outcomes(
        &outcomes,
        profile.shot_interval(),
        options.kill_window,
        profile.theoretical_ttk(),
    );
    debug!(
        "evaluated dmg={} rpm={} dist={} skill={:.3}: {}/{} kills, ETTK {:.4}s",
        profile.damage_per_hit, profile.rpm, profile.distance, skill_deg, result.kills, result.trials, result.expected_ttk
    );
    if result.kills == 0 {
        warn!(
            "no kill in {} trials (dmg={}, dist={}, max_shots={})",
            result.trials, profile.damage_per_hit, profile.distance, options.max_shots
        );
    }
    Ok(result)
}

/// Evaluate one (profile, skill) pair, seeded from `options`.
pub fn evaluate(
    profile: &WeaponProfile,
    skill_deg: f64,
    options: &EvalOptions,
    constants: &ModelConstants,
) -> Result<EvaluationResult> {
    let mut rng = options.rng();
    evaluate_with_rng(profile, skill_deg, options, constants, &mut rng)
}

/// Evaluate every selected catalog distance of one weapon.
///
/// Each distance gets its own stream keyed by weapon, distance and skill,
/// so results don't depend on which other distances were requested.
pub fn evaluate_weapon(name: &str, spec: &WeaponSpec, run: &RunConfig) -> Result<WeaponReport> {
    let mut rows = Vec::with_capacity(spec.damage.len());
    for point in &spec.damage {
        if !run.includes_distance(point.distance) {
            continue;
        }
        let profile = spec.profile_for(point, &run.target)?;
        let mut rng = run.options.rng_for_key(&seed_key(name, point.distance, run.skill));
        let result = evaluate_with_rng(&profile, run.skill, &run.options, &run.constants, &mut rng)?;
        rows.push(DistanceRow {
            distance: point.distance,
            damage: point.damage,
            result,
        });
    }
    Ok(WeaponReport {
        name: name.to_string(),
        category: spec.category.clone(),
        rpm: spec.rpm,
        rows,
    })
}

/// Evaluate the selected weapons of `catalog` (all of them if the run
/// names none). Reports come back in selection order either way.
pub fn evaluate_catalog(catalog: &WeaponCatalog, run: &RunConfig, parallel: bool) -> Result<Vec<WeaponReport>> {
    run.validate()?;
    let selected: Vec<(&str, &WeaponSpec)> = if run.weapons.is_empty() {
        catalog.iter().collect()
    } else {
        run.weapons
            .iter()
            .map(|name| catalog.get(name).map(|spec| (name.as_str(), spec)))
            .collect::<Result<_>>()?
    };
    debug!(
        "evaluating {} weapons ({} trials each, parallel={})",
        selected.len(),
        run.options.trials,
        parallel
    );

    if parallel {
        selected
            .par_iter()
            .map(|(name, spec)| evaluate_weapon(name, spec, run))
            .collect()
    } else {
        selected
            .iter()
            .map(|(name, spec)| evaluate_weapon(name, spec, run))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_spread_constants() -> ModelConstants {
        ModelConstants {
            base_spread_deg: 0.0,
            bloom_best_deg: 0.0,
            bloom_worst_deg: 0.0,
            drift_best_deg: 0.0,
            drift_worst_deg: 0.0,
            ..ModelConstants::default()
        }
    }

    fn profile() -> WeaponProfile {
        WeaponProfile::new(25.0, 600.0, 20.0, 60.0, 50.0).unwrap()
    }

    #[test]
    fn test_perfect_aim_kills_on_schedule() {
        let constants = zero_spread_constants();
        let params = ModelParameters::derive(&profile(), 0.0, &constants);
        let mut rng = SimRng::new(1);
        let outcome = simulate_duel(&params, &constants, 50, 800, &mut rng).unwrap();
        assert_eq!(outcome.shots, 4);
        assert_eq!(outcome.hits, 4);
        assert_eq!(outcome.misses, 0);
        assert!((outcome.ttk - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_duel_state_machine_stops_after_kill() {
        let constants = zero_spread_constants();
        let params = ModelParameters::derive(&profile(), 0.0, &constants);
        let mut rng = SimRng::new(1);
        let mut duel = Duel::new(&params, &constants, 50, 800);
        assert_eq!(duel.state(), DuelState::Firing);
        for _ in 0..3 {
            assert_eq!(duel.fire(&mut rng), DuelState::Firing);
        }
        let killed = duel.fire(&mut rng);
        assert!(matches!(killed, DuelState::Killed(_)));
        // Further calls do nothing.
        assert_eq!(duel.fire(&mut rng), killed);
        assert_eq!(duel.shots_fired(), 4);
        assert_eq!(duel.hits(), 4);
    }

    #[test]
    fn test_duel_exhausts_budget() {
        let constants = ModelConstants::default();
        let p = profile().with_target_radius(0.0).unwrap();
        let params = ModelParameters::derive(&p, 0.1, &constants);
        let mut rng = SimRng::new(9);
        let mut duel = Duel::new(&params, &constants, 7, 50);
        let mut last = DuelState::Firing;
        while last == DuelState::Firing {
            last = duel.fire(&mut rng);
        }
        assert_eq!(last, DuelState::Exhausted);
        assert_eq!(duel.shots_fired(), 7);
        assert_eq!(duel.hits(), 0);
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let mut rng = SimRng::new(1);
        let mut bad = profile();
        bad.damage_per_hit = 0.0;
        assert!(matches!(simulate_one_duel(&bad, 0.1, &mut rng), Err(SimError::InvalidDamage(_))));
        assert!(matches!(
            simulate_one_duel(&profile(), -0.1, &mut rng),
            Err(SimError::InvalidSkill(_))
        ));

        let options = EvalOptions {
            trials: 0,
            ..EvalOptions::default()
        };
        assert!(evaluate(&profile(), 0.1, &options, &ModelConstants::default()).is_err());

        let options = EvalOptions {
            kill_window: 0.0,
            ..EvalOptions::default()
        };
        assert!(evaluate(&profile(), 0.1, &options, &ModelConstants::default()).is_err());
    }

    #[test]
    fn test_same_seed_same_outcomes() {
        let options = EvalOptions {
            trials: 50,
            ..EvalOptions::default()
        }
        .with_seed(17);
        let constants = ModelConstants::default();
        let a = simulate_trials(&profile(), 0.12, &options, &constants).unwrap();
        let b = simulate_trials(&profile(), 0.12, &options, &constants).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_trials_share_one_stream() {
        let options = EvalOptions {
            trials: 3,
            ..EvalOptions::default()
        }
        .with_seed(5);
        let constants = ModelConstants::default();
        let batch = simulate_trials(&profile(), 0.1, &options, &constants).unwrap();

        let params = ModelParameters::derive(&profile(), 0.1, &constants);
        let mut rng = SimRng::new(5);
        let by_hand: Vec<_> = (0..3)
            .map(|_| simulate_duel(&params, &constants, 50, 800, &mut rng))
            .collect();
        assert_eq!(batch, by_hand);
    }

    #[test]
    fn test_rng_for_key_prefers_fixed_seed() {
        let fixed = EvalOptions::default().with_seed(3);
        assert_eq!(fixed.rng_for_key("x").next_word(), SimRng::new(3).next_word());
        let keyed = EvalOptions::default();
        assert_eq!(keyed.rng_for_key("x").next_word(), SimRng::from_key("x").next_word());
    }
}
