use std::path::Path;
use std::process::exit;

use tracing_subscriber::EnvFilter;

use remem::network::{NetConfig, Network, RunOutput};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut cfg = NetConfig::default();
    let mut out_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" | "help" => {
                print_help();
                return;
            }
            "--config" => {
                i += 1;
                let path = expect_value(&args, i, "--config");
                cfg = match load_config(path) {
                    Ok(cfg) => cfg,
                    Err(e) => {
                        eprintln!("cannot load {path}: {e}");
                        exit(2);
                    }
                };
            }
            "--seed" => {
                i += 1;
                let value = expect_value(&args, i, "--seed");
                cfg.seed = match value.parse() {
                    Ok(seed) => seed,
                    Err(_) => {
                        eprintln!("--seed expects an unsigned integer, got {value:?}");
                        exit(2);
                    }
                };
            }
            "--out" => {
                i += 1;
                out_path = Some(expect_value(&args, i, "--out").to_string());
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                exit(2);
            }
        }
        i += 1;
    }

    let network = match Network::build(cfg) {
        Ok(network) => network,
        Err(e) => {
            eprintln!("setup failed: {e}");
            exit(1);
        }
    };
    let output = match network.run() {
        Ok(output) => output,
        Err(e) => {
            eprintln!("simulation failed: {e}");
            exit(1);
        }
    };

    let summary = output.summary();
    println!(
        "populations={} iterations={} peak_rate={:.4} (memory {} at step {})",
        summary.num_populations,
        summary.num_iterations,
        summary.peak_rate,
        summary.peak_memory,
        summary.peak_step
    );

    if let Some(path) = out_path {
        if let Err(e) = write_output(&path, &output) {
            eprintln!("cannot write {path}: {e}");
            exit(1);
        }
        println!("trajectories written to {path}");
    }
}

fn expect_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i) {
        Some(v) => v,
        None => {
            eprintln!("{flag} expects a value");
            exit(2);
        }
    }
}

fn load_config(path: &str) -> Result<NetConfig, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

// Plain JSON, or lz4 with a prepended size when the path says so.
fn write_output(path: &str, output: &RunOutput) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_vec(output)?;
    let compress = Path::new(path)
        .extension()
        .map(|ext| ext == "lz4")
        .unwrap_or(false);
    if compress {
        std::fs::write(path, lz4_flex::compress_prepend_size(&json))?;
    } else {
        std::fs::write(path, json)?;
    }
    Ok(())
}

fn print_help() {
    println!("remem (oscillation-driven sequential memory retrieval)");
    println!("usage:");
    println!("  remem [--config FILE] [--seed N] [--out FILE]");
    println!();
    println!("  --config FILE   JSON parameter file (missing fields take defaults)");
    println!("  --seed N        override the random seed");
    println!("  --out FILE      write trajectories as JSON (.lz4 to compress)");
}
