//! smpsite CLI - Monte Carlo evaluation of paleomagnetic sampling designs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use smpsite::config::EXAMPLE_CONFIG;
use smpsite::output::{write_batch_csv, write_summary_csv};
use smpsite::{simulate_estimations, summarize_batch, SimulationConfig};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "smpsite")]
#[command(version)]
#[command(about = "Simulate paleomagnetic sampling designs and estimate pole errors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "smpsite.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation batch
    Simulate {
        /// Path to output batch CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Path to output summary CSV file
        #[arg(short, long)]
        summary: Option<PathBuf>,

        /// Override the number of trials
        #[arg(short = 'n', long)]
        n_iters: Option<usize>,

        /// Override the seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn load_config(cli: &Cli) -> Result<SimulationConfig> {
    SimulationConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match &cli.command {
        Commands::Example => {
            println!("{EXAMPLE_CONFIG}");
        }

        Commands::Validate => {
            let config = load_config(&cli)?;
            let params = &config.params;
            info!("Configuration is valid");
            info!(
                "  Design: {} samples over {} sites of {}",
                params.total_samples,
                params.n_sites(),
                params.samples_per_site
            );
            info!(
                "  Secular model: {} (kappa {:.2})",
                params.secular_method,
                params.secular_kappa()?
            );
            info!(
                "  Trials: {}, outlier policy: {}",
                config.simulation.n_iters, config.simulation.outlier_policy
            );
        }

        Commands::Simulate {
            output,
            summary,
            n_iters,
            seed,
        } => {
            let mut config = load_config(&cli)?;
            if let Some(n) = n_iters {
                config.simulation.n_iters = *n;
            }
            if seed.is_some() {
                config.simulation.seed = *seed;
            }

            let batch = simulate_estimations(&config.params, &config.simulation)
                .context("Simulation failed")?;
            write_batch_csv(output, &batch)?;
            info!("Wrote {} trials to {:?}", batch.len(), output);

            let stats = summarize_batch(&batch)?;
            if let Some(path) = summary {
                write_summary_csv(path, std::slice::from_ref(&stats))?;
                info!("Wrote summary to {:?}", path);
            }

            println!("\n=== Simulation Complete ===");
            println!("Trials:          {}", stats.total_simulations);
            println!("Error angle:     {:.3} (median {:.3})", stats.error_angle_mean, stats.error_angle_50);
            println!("Error 95%:       {:.3}", stats.error_angle_95);
            println!("RMS error:       {:.3}", stats.error_angle_s);
            match stats.error_vgp_scatter {
                Some(e) => println!("VGP scatter err: {e:.3}"),
                None => println!("VGP scatter err: undefined (single site)"),
            }
        }
    }

    Ok(())
}
