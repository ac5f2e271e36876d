//! Debug script to print derived model parameters for tuning

use std::env;
use ttk_sim::config::TargetSpec;
use ttk_sim::{ModelConstants, ModelParameters, WeaponCatalog};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    let constants = ModelConstants::default();

    // If catalog path provided, print parameters for every weapon/distance
    if args.len() > 1 {
        let skill: f64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.1);
        match WeaponCatalog::from_file(&args[1]) {
            Ok(catalog) => {
                let target = TargetSpec::default();
                for (name, spec) in catalog.iter() {
                    println!("\n=== {} @ skill {:.2}° ===", name, skill);
                    for point in &spec.damage {
                        match spec.profile_for(point, &target) {
                            Ok(profile) => {
                                let p = ModelParameters::derive(&profile, skill, &constants);
                                println!(
                                    "  {:>6}m  sigma={:.4}°  drift={:.4}°  alpha={:.3}  R/d={:.4}°  H={}",
                                    point.distance,
                                    p.total_spread().to_degrees(),
                                    p.drift_step.to_degrees(),
                                    p.alpha,
                                    p.target_angle.to_degrees(),
                                    p.hits_to_kill
                                );
                            }
                            Err(e) => println!("  {:>6}m  {}", point.distance, e),
                        }
                    }
                }
                return;
            }
            Err(e) => {
                eprintln!("Error loading catalog: {}", e);
            }
        }
    }

    println!("\n=== MAPPER SWEEP ===");
    println!("Precision -> bloom:");
    for precision in [20.0, 34.0, 48.0, 62.0, 76.0] {
        println!("  {:>5}: {:.4}°", precision, constants.bloom_for_precision(precision).to_degrees());
    }
    println!("Control -> drift step / c:");
    for control in [8.0, 22.0, 36.5, 51.0, 65.0] {
        println!(
            "  {:>5}: {:.4}°/shot  c={:.3}",
            control,
            constants.drift_for_control(control).to_degrees(),
            constants.control_norm(control)
        );
    }
    println!("Skill -> alpha:");
    for skill in [0.01, 0.05, 0.10, 0.15, 0.20, 0.30] {
        println!("  {:>5.2}°: {:.3}", skill, constants.alpha_from_skill(skill));
    }
}
