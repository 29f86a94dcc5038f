use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use monascope::config::{ConfigLoader, DashboardConfig};
use monascope::dashboard::DashboardView;
use monascope::poller::DashboardState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "monascope")]
#[command(version = "0.1.0")]
#[command(about = "Live chain metrics sampled from a JSON-RPC endpoint", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the endpoint until interrupted
    Watch {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show a live status spinner (stderr)
        #[arg(short, long, default_value_t = false)]
        progress: bool,
    },
    /// Run a single sampling cycle and print the result
    Sample {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the snapshot as JSON instead of cards
        #[arg(long)]
        json: bool,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> monascope::Result<DashboardConfig> {
    match path {
        Some(path) => {
            log::info!("Loading config from {:?}", path);
            ConfigLoader::load(path)
        }
        None => ConfigLoader::load_default(),
    }
}

fn status_line(state: &DashboardState) -> String {
    match (&state.latest, &state.last_error) {
        (_, Some(error)) => format!("Error: {}", error),
        (Some(s), None) => format!(
            "Block: {} | Txs: {} | Contracts: {} | TPS: {}",
            s.block_height,
            s.window_transaction_count,
            s.window_contract_creation_count,
            s.throughput_display()
        ),
        (None, None) => "Loading...".to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let level = logger.filter();
    let multi = Arc::new(MultiProgress::new());

    match cli.command {
        Commands::Watch { config, progress } => {
            if progress {
                indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
            } else {
                log::set_boxed_logger(Box::new(logger))?;
            }
            log::set_max_level(level);

            let config_data = load_config(config.as_deref())?;
            log::info!("Watching {} at {}", config_data.name, config_data.rpc_url);

            let poller = Arc::new(ConfigLoader::create_poller(&config_data)?);
            let mut output =
                ConfigLoader::create_output(&config_data, progress.then(|| multi.clone())).await?;

            let spinner = if progress {
                let pb = multi.add(ProgressBar::new_spinner());
                pb.set_style(ProgressStyle::default_spinner()
                    .template("{spinner:.magenta} [{elapsed_precise}] {msg}")?);
                pb.enable_steady_tick(Duration::from_millis(120));
                pb.set_message("Loading...");
                Some(pb)
            } else {
                None
            };

            let mut dashboard_rx = poller.subscribe();
            let handle = poller.clone().spawn();
            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        log::info!("Shutting down...");
                        break;
                    }
                    changed = dashboard_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = dashboard_rx.borrow_and_update().clone();
                        if let Some(pb) = &spinner {
                            pb.set_message(status_line(&state));
                        }
                        if let Err(e) = output.write(&state).await {
                            log::error!("Error writing snapshot: {}", e);
                        }
                    }
                }
            }

            handle.stop();
            output.close().await?;

            let final_metrics = poller.get_metrics();
            if let Some(pb) = spinner {
                pb.finish_with_message(format!(
                    "{} cycles | Success: {:.1}% - Stopped",
                    final_metrics.cycles_completed, final_metrics.success_rate
                ));
            }

            println!("\n✅ Polling stopped:");
            println!("   Cycles Completed: {}", final_metrics.cycles_completed);
            println!("   Cycles Failed: {}", final_metrics.cycles_failed);
            println!("   Ticks Skipped: {}", final_metrics.ticks_skipped);
            println!("   Blocks Missing: {}", final_metrics.blocks_missing);
            println!("   RPC Success Rate: {:.1}%", final_metrics.success_rate);
            println!("   Average Duration: {}ms", final_metrics.avg_response_time_ms);
            println!("   Total Time: {:.1}s", final_metrics.elapsed_seconds);
        }
        Commands::Sample { config, json } => {
            log::set_boxed_logger(Box::new(logger))?;
            log::set_max_level(level);

            let config_data = load_config(config.as_deref())?;
            let sampler = ConfigLoader::create_sampler(&config_data)?;
            let snapshot = sampler.sample().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                let view = DashboardView::new(config_data.window_size, config_data.network_launch);
                let state = DashboardState {
                    latest: Some(snapshot),
                    last_error: None,
                    cycles_completed: 1,
                };
                println!("{}", view.render(&state, Utc::now()));
            }
        }
        Commands::Check { config } => {
            match ConfigLoader::load(&config) {
                Ok(cfg) => {
                    println!("✅ Config is valid:");
                    println!("   Name: {}", cfg.name);
                    println!("   RPC URL: {}", cfg.rpc_url);
                    println!("   Poll Interval: {}ms", cfg.poll_interval_ms);
                    println!("   Window: {} blocks", cfg.window_size);
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
