//! Train on a generated stage dataset and print the selected model.
//!
//! ```sh
//! cargo run -p cirrhosis-classifiers --example synthetic_pipeline -- /tmp/pbc.csv
//! ```
use std::error::Error;
use std::fs::File;
use std::io::Write;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cirrhosis_classifiers::config::PipelineConfig;
use cirrhosis_classifiers::pipeline;

fn write_synthetic_csv(path: &str, n: usize) -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut file = File::create(path)?;
    writeln!(file, "patient_id,bilirubin,albumin,copper,sex,stage")?;
    for id in 0..n {
        let stage = match rng.gen_range(0..100) {
            0..=59 => 1,
            60..=84 => 2,
            _ => 3,
        };
        let s = stage as f64;
        let bilirubin = if rng.gen_bool(0.05) {
            "NA".to_string()
        } else {
            format!("{:.2}", s * 1.5 + rng.gen_range(0.0..2.0))
        };
        let sex = if rng.gen_bool(0.85) { "F" } else { "M" };
        writeln!(
            file,
            "{},{},{:.2},{:.0},{},{}",
            id,
            bilirubin,
            4.2 - s * 0.3 + rng.gen_range(-0.3..0.3),
            40.0 + s * 30.0 + rng.gen_range(0.0..40.0),
            sex,
            stage
        )?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "synthetic_pbc.csv".to_string());
    write_synthetic_csv(&path, 300)?;

    let config = PipelineConfig {
        data_path: path,
        ..PipelineConfig::default()
    };
    let outcome = pipeline::run(&config)?;

    println!("Best model: {}", outcome.best_model);
    for f in &outcome.top_features {
        println!("  {:<12} {:.4}", f.feature, f.importance);
    }
    Ok(())
}
