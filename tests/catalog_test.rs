//! Catalog runs: loading, selection, per-cell seeding and parallel parity

use ttk_sim::{
    best_by_distance, evaluate_catalog, evaluate_weapon, evaluate_with_rng, seed_key, Metric, RunConfig, SimError,
    SimRng, WeaponCatalog, WeaponReport,
};

const CATALOG_YAML: &str = "\
AK-47:
  category: AR
  control: 40
  precision: 55
  rpm: 600
  damage: { 10: 30, 30: 27.5, 50: 25 }
M4:
  category: AR
  control: 55
  precision: 62
  rpm: 750
  damage: { 10: 26, 30: 24, 50: 20 }
MP5:
  category: SMG
  control: 60
  precision: 45
  rpm: 800
  damage: { 10: 22, 30: 18 }
";

fn catalog() -> WeaponCatalog {
    WeaponCatalog::from_yaml(CATALOG_YAML).unwrap()
}

fn quick_run() -> RunConfig {
    let mut run = RunConfig {
        skill: 0.12,
        ..RunConfig::default()
    };
    run.options.trials = 60;
    run
}

fn assert_same_reports(a: &[WeaponReport], b: &[WeaponReport]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert_eq!(x.name, y.name);
        assert_eq!(x.rows.len(), y.rows.len());
        for (rx, ry) in x.rows.iter().zip(&y.rows) {
            assert_eq!(rx.distance, ry.distance);
            assert_eq!(rx.result, ry.result, "{} @ {}", x.name, rx.distance);
        }
    }
}

#[test]
fn test_full_catalog_run() {
    let reports = evaluate_catalog(&catalog(), &quick_run(), false).unwrap();

    let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["AK-47", "M4", "MP5"]);

    let ak = &reports[0];
    assert_eq!(ak.category, "AR");
    assert_eq!(ak.rpm, 600.0);
    assert_eq!(ak.rows.iter().map(|r| r.distance).collect::<Vec<_>>(), vec![10.0, 30.0, 50.0]);
    // 100 HP / 25 dmg -> 4 hits at 0.1 s spacing.
    let far = ak.row_at(50.0).unwrap();
    assert_eq!(far.damage, 25.0);
    assert!((far.result.theoretical_ttk - 0.3).abs() < 1e-12);
    assert_eq!(far.result.trials, 60);

    assert_eq!(reports[2].rows.len(), 2);
    for row in reports.iter().flat_map(|r| r.rows.iter()) {
        let r = &row.result;
        assert!(r.auc <= r.kill_probability);
        if r.kills > 0 {
            assert!(r.expected_ttk >= r.theoretical_ttk - 1e-12);
        }
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let catalog = catalog();
    let run = quick_run();
    let sequential = evaluate_catalog(&catalog, &run, false).unwrap();
    let parallel = evaluate_catalog(&catalog, &run, true).unwrap();
    assert_same_reports(&sequential, &parallel);
}

#[test]
fn test_selection_order_is_preserved() {
    let mut run = quick_run();
    run.weapons = vec!["MP5".to_string(), "AK-47".to_string()];
    let reports = evaluate_catalog(&catalog(), &run, true).unwrap();
    let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["MP5", "AK-47"]);
}

#[test]
fn test_cells_are_seeded_by_key() {
    let catalog = catalog();
    let run = quick_run();
    let full = evaluate_catalog(&catalog, &run, false).unwrap();

    // Narrowing the distance selection must not shift the remaining cells.
    let mut narrow = run.clone();
    narrow.distances = vec![30.0];
    let only_30 = evaluate_catalog(&catalog, &narrow, false).unwrap();
    for (all, one) in full.iter().zip(&only_30) {
        assert_eq!(one.rows.len(), 1);
        assert_eq!(all.row_at(30.0).unwrap().result, one.rows[0].result);
    }

    // Each cell is exactly an evaluation on the keyed stream.
    let spec = catalog.get("M4").unwrap();
    let profile = catalog.profile("M4", 10.0, &run.target).unwrap();
    let mut rng = SimRng::from_key(&seed_key("M4", 10.0, run.skill));
    let by_hand = evaluate_with_rng(&profile, run.skill, &run.options, &run.constants, &mut rng).unwrap();
    let report = evaluate_weapon("M4", spec, &run).unwrap();
    assert_eq!(report.row_at(10.0).unwrap().result, by_hand);
}

#[test]
fn test_fixed_seed_overrides_keys() {
    let catalog = catalog();
    let mut run = quick_run();
    run.options.seed = Some(42);
    let spec = catalog.get("AK-47").unwrap();

    let a = evaluate_weapon("AK-47", spec, &run).unwrap();
    let profile = catalog.profile("AK-47", 30.0, &run.target).unwrap();
    let mut rng = SimRng::new(42);
    let by_hand = evaluate_with_rng(&profile, run.skill, &run.options, &run.constants, &mut rng).unwrap();
    assert_eq!(a.row_at(30.0).unwrap().result, by_hand);
}

#[test]
fn test_best_by_distance_over_reports() {
    let reports = evaluate_catalog(&catalog(), &quick_run(), false).unwrap();
    let best = best_by_distance(&reports, Metric::Ttk);
    assert_eq!(best.iter().map(|b| b.0).collect::<Vec<_>>(), vec![10.0, 30.0, 50.0]);

    for &(distance, value) in &best {
        let min = reports
            .iter()
            .filter_map(|r| r.row_at(distance))
            .map(|row| row.result.theoretical_ttk)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(value, min);
    }
    // MP5 has no 50 m entry, so the 50 m winner comes from the rifles.
    let at_50 = best.iter().find(|b| b.0 == 50.0).unwrap().1;
    assert!(reports[..2].iter().any(|r| r.row_at(50.0).unwrap().result.theoretical_ttk == at_50));
}

#[test]
fn test_unknown_weapon_is_an_error() {
    let mut run = quick_run();
    run.weapons = vec!["AK-47".to_string(), "Nope".to_string()];
    let err = evaluate_catalog(&catalog(), &run, false).unwrap_err();
    assert!(matches!(err, SimError::UnknownWeapon(ref name) if name == "Nope"));
}

#[test]
fn test_invalid_run_config_is_an_error() {
    let mut run = quick_run();
    run.skill = f64::NAN;
    assert!(matches!(
        evaluate_catalog(&catalog(), &run, false),
        Err(SimError::InvalidSkill(_))
    ));

    let mut run = quick_run();
    run.options.trials = 0;
    assert!(matches!(
        evaluate_catalog(&catalog(), &run, false),
        Err(SimError::InvalidOption { name: "trials", .. })
    ));
}

#[test]
fn test_files_on_disk() {
    let dir = std::env::temp_dir();
    let catalog_path = dir.join(format!("ttk_sim_it_catalog_{}.yaml", std::process::id()));
    let run_path = dir.join(format!("ttk_sim_it_run_{}.json", std::process::id()));
    std::fs::write(&catalog_path, CATALOG_YAML).unwrap();
    std::fs::write(
        &run_path,
        r#"{ "skill": 0.05, "options": { "trials": 40, "seed": 7 }, "weapons": ["M4"], "distances": [50] }"#,
    )
    .unwrap();

    let catalog = WeaponCatalog::from_file(&catalog_path).unwrap();
    let run = RunConfig::from_file(&run_path).unwrap();
    std::fs::remove_file(&catalog_path).ok();
    std::fs::remove_file(&run_path).ok();

    assert_eq!(run.options.trials, 40);
    assert_eq!(run.options.max_shots, 50);
    let reports = evaluate_catalog(&catalog, &run, false).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].rows.len(), 1);
    assert_eq!(reports[0].rows[0].distance, 50.0);
    assert_eq!(reports[0].rows[0].result.trials, 40);

    let json = serde_json::to_value(&reports).unwrap();
    assert_eq!(json[0]["name"], "M4");
    assert!(json[0]["rows"][0]["result"].get("Kill@W").is_some());
}
