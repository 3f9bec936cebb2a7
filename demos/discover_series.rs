// demos/discover_series.rs
// Short structure search on a synthetic trend + seasonal series. Takes an
// optional TOML config path; `KERNDISC__*` environment variables override it.

use anyhow::{Context, Result};
use kerndisc::engines::evaluation::{rank_components, ExactGpBackend, FitBackend};
use kerndisc::data::preprocess;
use kerndisc::kernels::{ast_to_kernel, pretty_print};
use kerndisc::{discover, DiscoveryConfig};
use log::info;

fn synthetic_series(n: usize) -> (Vec<f64>, Vec<f64>) {
    let x: Vec<f64> = (0..n).map(|i| i as f64 * 0.25).collect();
    let y = x
        .iter()
        .enumerate()
        .map(|(i, t)| {
            // deterministic pseudo-noise so runs are comparable
            let noise = ((i * 7919) % 101) as f64 / 101.0 - 0.5;
            0.4 * t + (t * std::f64::consts::TAU / 3.0).sin() + 0.1 * noise
        })
        .collect();
    (x, y)
}

fn main() -> Result<()> {
    env_logger::init();

    let path = std::env::args().nth(1);
    let mut config = DiscoveryConfig::load_layered(path.as_deref())
        .context("Failed to load discovery configuration")?;
    if path.is_none() && std::env::var("KERNDISC__SEARCH__SEARCH_DEPTH").is_err() {
        config.search.search_depth = 2;
    }

    let (x, y) = synthetic_series(40);
    info!("Searching {} points with metric {}", x.len(), config.evaluation.metric);
    let result = discover(&x, &y, &config)?;

    println!("Stopped: {}", result.termination_reason);
    println!("Explored {} kernel structures", result.explored);
    for (rank, kernel) in result.kernels.iter().enumerate() {
        println!("{:>2}. {:<40} {:.3}", rank + 1, kernel.key, kernel.score);
    }

    let Some(best) = result.best() else {
        return Ok(());
    };
    println!("\n{}", pretty_print(&best.ast));

    // Rebuild the winner on the same preprocessed data to rank its summands.
    let (x, y) = preprocess(&x, &y, config.preprocessing.rescale_x_to_upper_bound)?;
    let backend = ExactGpBackend::new(config.evaluation.max_optimizer_evaluations);
    let mut model = backend.build(&x, &y, ast_to_kernel(&best.ast)?)?;
    if let Some(params) = &best.params {
        model.assign(params)?;
    }
    match rank_components(&backend, model.as_ref(), best.score, &config.evaluation.metric) {
        Ok(ranked) => {
            for component in ranked {
                println!("  {:<30} impact {:.3}", component.component, component.impact);
            }
        }
        Err(e) => println!("  {}", e),
    }

    println!("\n{}", result.to_json()?);
    Ok(())
}
