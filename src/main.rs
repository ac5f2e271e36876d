//! CLI entry point for the TTK simulator

use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Instant;
use ttk_sim::{
    best_by_distance, evaluate_catalog, Metric, ModelParameters, RunConfig, WeaponCatalog, WeaponReport,
};

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "ttk-sim")]
#[command(version)]
#[command(about = "Stochastic time-to-kill estimates for a weapon catalog", long_about = None)]
struct Args {
    /// Path to the weapon catalog (YAML or JSON)
    #[arg(short, long)]
    catalog: PathBuf,

    /// Run configuration file (YAML or JSON); CLI flags override it
    #[arg(short, long)]
    run_config: Option<PathBuf>,

    /// Weapon to evaluate (repeatable; default: all)
    #[arg(short, long)]
    weapon: Vec<String>,

    /// Distance to evaluate (repeatable; default: every catalog distance)
    #[arg(short, long)]
    distance: Vec<f64>,

    /// Player aim jitter in degrees (0.01 = excellent, 0.30 = poor)
    #[arg(short, long)]
    skill: Option<f64>,

    /// Duels per evaluation
    #[arg(short = 'n', long)]
    trials: Option<u32>,

    /// Window for Kill@W and AUC@W, in seconds
    #[arg(long)]
    kill_window: Option<f64>,

    /// Shot budget per duel
    #[arg(long)]
    max_shots: Option<u32>,

    /// Monte Carlo samples per hit-probability estimate
    #[arg(long)]
    samples: Option<u32>,

    /// Fixed seed for every evaluation (default: derived per weapon/distance/skill)
    #[arg(long)]
    seed: Option<u32>,

    /// Evaluate weapons in parallel
    #[arg(short, long, default_value = "false")]
    parallel: bool,

    /// Worker threads for --parallel (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Show timing information
    #[arg(short, long, default_value = "false")]
    timing: bool,

    /// Debug: print derived model parameters instead of simulating
    #[arg(long, default_value = "false")]
    debug_params: bool,
}

impl Args {
    fn run_config(&self) -> ttk_sim::Result<RunConfig> {
        let mut run = match &self.run_config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };
        if !self.weapon.is_empty() {
            run.weapons = self.weapon.clone();
        }
        if !self.distance.is_empty() {
            run.distances = self.distance.clone();
        }
        if let Some(skill) = self.skill {
            run.skill = skill;
        }
        if let Some(trials) = self.trials {
            run.options.trials = trials;
        }
        if let Some(window) = self.kill_window {
            run.options.kill_window = window;
        }
        if let Some(max_shots) = self.max_shots {
            run.options.max_shots = max_shots;
        }
        if let Some(samples) = self.samples {
            run.options.sample_count = samples;
        }
        if self.seed.is_some() {
            run.options.seed = self.seed;
        }
        run.validate()?;
        Ok(run)
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let catalog = match WeaponCatalog::from_file(&args.catalog) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading catalog: {}", e);
            std::process::exit(1);
        }
    };
    info!("loaded {} weapons from {}", catalog.len(), args.catalog.display());

    let run = match args.run_config() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error in run configuration: {}", e);
            std::process::exit(1);
        }
    };

    if args.debug_params {
        print_params(&catalog, &run);
        return;
    }

    if args.parallel {
        let threads = args.threads.unwrap_or_else(num_cpus::get);
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            warn!("could not size thread pool: {}", e);
        }
    }

    let start = Instant::now();
    let reports = match evaluate_catalog(&catalog, &run, args.parallel) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();
    let evaluations: usize = reports.iter().map(|r| r.rows.len()).sum();
    info!("{} evaluations in {:.3}s", evaluations, elapsed.as_secs_f64());

    match args.output {
        OutputFormat::Text => {
            println!("=== TTK Simulation Results ===");
            println!(
                "Skill: {:.2}°   Trials: {}   Window: {:.2}s   Target: {} HP, r={}",
                run.skill, run.options.trials, run.options.kill_window, run.target.health, run.target.radius
            );
            println!();
            print_reports(&reports);

            if args.timing {
                println!("--- Performance ---");
                println!("Total time: {:.3}s", elapsed.as_secs_f64());
                if evaluations > 0 {
                    println!(
                        "Per evaluation: {:.3}ms",
                        elapsed.as_secs_f64() * 1000.0 / evaluations as f64
                    );
                }
                println!("Threads: {}", if args.parallel { rayon::current_num_threads() } else { 1 });
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "skill": run.skill,
                "options": run.options,
                "target": run.target,
                "parallel": args.parallel,
                "elapsed_seconds": elapsed.as_secs_f64(),
                "weapons": reports,
            });
            match serde_json::to_string_pretty(&output) {
                Ok(s) => println!("{}", s),
                Err(e) => {
                    eprintln!("Failed to serialize results: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn print_reports(reports: &[WeaponReport]) {
    // Only mark winners when there is something to compare against.
    let compare = reports.len() > 1;
    let best_ttk = best_by_distance(reports, Metric::Ttk);
    let best_ettk = best_by_distance(reports, Metric::Ettk);
    let is_best = |best: &[(f64, f64)], distance: f64, value: f64| {
        compare && best.iter().any(|&(d, v)| d == distance && v == value)
    };

    for report in reports {
        println!("--- {} ({}, {} RPM) ---", report.name, report.category, report.rpm);
        println!(
            "{:>7} {:>7} {:>9} {:>9} {:>7} {:>7} {:>8} {:>7}",
            "Dist", "Dmg", "TTK", "ETTK", "Kill@W", "AUC@W", "Acc", "Shots"
        );
        for row in &report.rows {
            let r = &row.result;
            let ttk_mark = if is_best(&best_ttk, row.distance, r.theoretical_ttk) { "*" } else { " " };
            let ettk_mark = if is_best(&best_ettk, row.distance, r.expected_ttk) { "*" } else { " " };
            println!(
                "{:>7} {:>7} {:>8.3}{} {:>8.3}{} {:>7.3} {:>7.3} {:>7.1}% {:>7.2}",
                row.distance,
                row.damage,
                r.theoretical_ttk,
                ttk_mark,
                r.expected_ttk,
                ettk_mark,
                r.kill_probability,
                r.auc,
                r.accuracy * 100.0,
                r.avg_shots
            );
        }
        println!();
    }
}

fn print_params(catalog: &WeaponCatalog, run: &RunConfig) {
    for (name, spec) in catalog.iter() {
        if !run.includes_weapon(name) {
            continue;
        }
        println!("============================================================");
        println!("{} ({}) precision={} control={} rpm={}", name, spec.category, spec.precision, spec.control, spec.rpm);
        println!("============================================================");
        for point in spec.damage.iter().filter(|p| run.includes_distance(p.distance)) {
            let profile = match spec.profile_for(point, &run.target) {
                Ok(p) => p,
                Err(e) => {
                    println!("  {:>6}: {}", point.distance, e);
                    continue;
                }
            };
            let params = ModelParameters::derive(&profile, run.skill, &run.constants);
            println!(
                "  {:>6}m  sigma={:.4}°  drift={:.4}°/shot  alpha={:.3}  c={:.3}  R/d={:.4}°  H={}  dt={:.4}s",
                point.distance,
                params.total_spread().to_degrees(),
                params.drift_step.to_degrees(),
                params.alpha,
                params.control_norm,
                params.target_angle.to_degrees(),
                params.hits_to_kill,
                params.shot_interval
            );
        }
        println!();
    }
}
