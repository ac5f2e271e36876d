//! Python bindings for the TTK simulator using PyO3

use crate::config::{RunConfig, WeaponCatalog};
use crate::error::SimError;
use crate::model::ModelConstants;
use crate::simulation::{self, evaluate_catalog, EvalOptions};
use crate::stats::EvaluationResult;
use crate::weapon::WeaponProfile;
use numpy::PyArray1;
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn to_py_err(e: SimError) -> PyErr {
    match e {
        SimError::Io(_) => PyIOError::new_err(e.to_string()),
        _ => PyValueError::new_err(e.to_string()),
    }
}

fn result_to_dict<'py>(py: Python<'py>, result: &EvaluationResult) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("TTK", result.theoretical_ttk)?;
    dict.set_item("ETTK", result.expected_ttk)?;
    dict.set_item("Kill@W", result.kill_probability)?;
    dict.set_item("AUC@W", result.auc)?;
    dict.set_item("avgShots", result.avg_shots)?;
    dict.set_item("avgHits", result.avg_hits)?;
    dict.set_item("avgMisses", result.avg_misses)?;
    dict.set_item("accuracy", result.accuracy)?;
    dict.set_item("trials", result.trials)?;
    dict.set_item("kills", result.kills)?;
    Ok(dict)
}

/// Evaluate one weapon at one distance. Returns a dict keyed like the
/// result tables (TTK, ETTK, Kill@W, AUC@W, avgShots, ...).
#[pyfunction]
#[pyo3(signature = (damage_per_hit, rpm, distance, precision, control, skill=0.1, health=100.0, target_radius=0.17, trials=100, kill_window=1.0, max_shots=50, sample_count=800, seed=None))]
fn evaluate(
    py: Python<'_>,
    damage_per_hit: f64,
    rpm: f64,
    distance: f64,
    precision: f64,
    control: f64,
    skill: f64,
    health: f64,
    target_radius: f64,
    trials: u32,
    kill_window: f64,
    max_shots: u32,
    sample_count: u32,
    seed: Option<u32>,
) -> PyResult<PyObject> {
    let profile = WeaponProfile {
        health,
        damage_per_hit,
        rpm,
        distance,
        target_radius,
        precision,
        control,
    };
    let options = EvalOptions {
        trials,
        kill_window,
        max_shots,
        sample_count,
        seed,
    };

    // Release GIL during computation
    let result = py
        .allow_threads(|| simulation::evaluate(&profile, skill, &options, &ModelConstants::default()))
        .map_err(to_py_err)?;

    Ok(result_to_dict(py, &result)?.into())
}

/// Raw per-trial TTK as a numpy array; NaN marks trials with no kill.
#[pyfunction]
#[pyo3(signature = (damage_per_hit, rpm, distance, precision, control, skill=0.1, trials=100, seed=None))]
fn simulate_trials<'py>(
    py: Python<'py>,
    damage_per_hit: f64,
    rpm: f64,
    distance: f64,
    precision: f64,
    control: f64,
    skill: f64,
    trials: u32,
    seed: Option<u32>,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let profile = WeaponProfile::new(damage_per_hit, rpm, distance, precision, control).map_err(to_py_err)?;
    let options = EvalOptions {
        trials,
        seed,
        ..EvalOptions::default()
    };

    let outcomes = py
        .allow_threads(|| simulation::simulate_trials(&profile, skill, &options, &ModelConstants::default()))
        .map_err(to_py_err)?;

    let ttks: Vec<f64> = outcomes.iter().map(|o| o.map_or(f64::NAN, |o| o.ttk)).collect();
    Ok(PyArray1::from_vec(py, ttks))
}

/// Evaluate a whole catalog (JSON string). `run_json` may override skill,
/// options, constants, target and the weapon/distance selection.
#[pyfunction]
#[pyo3(signature = (catalog_json, run_json=None, parallel=true))]
fn evaluate_json(py: Python<'_>, catalog_json: &str, run_json: Option<&str>, parallel: bool) -> PyResult<String> {
    let catalog = WeaponCatalog::from_json(catalog_json).map_err(to_py_err)?;
    let run: RunConfig = match run_json {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| PyValueError::new_err(format!("Invalid run config JSON: {}", e)))?,
        None => RunConfig::default(),
    };

    let reports = py
        .allow_threads(|| evaluate_catalog(&catalog, &run, parallel))
        .map_err(to_py_err)?;

    serde_json::to_string(&reports)
        .map_err(|e| PyRuntimeError::new_err(format!("Failed to serialize results: {}", e)))
}

/// Seed for a free-form key, identical to the one catalog runs use.
#[pyfunction]
fn hash_seed(key: &str) -> u32 {
    crate::rng::hash_seed(key)
}

#[pyfunction]
fn seed_key(weapon: &str, distance: f64, skill: f64) -> String {
    crate::rng::seed_key(weapon, distance, skill)
}

/// Get number of threads being used for parallel evaluation
#[pyfunction]
fn get_thread_count() -> PyResult<usize> {
    Ok(rayon::current_num_threads())
}

/// Python module definition
#[pymodule]
fn ttk_sim(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(evaluate, m)?)?;
    m.add_function(wrap_pyfunction!(simulate_trials, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_json, m)?)?;
    m.add_function(wrap_pyfunction!(hash_seed, m)?)?;
    m.add_function(wrap_pyfunction!(seed_key, m)?)?;
    m.add_function(wrap_pyfunction!(get_thread_count, m)?)?;
    Ok(())
}
