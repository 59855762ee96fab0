use tracing_subscriber::EnvFilter;

use spendwatch::anomaly::AnomalyEngine;
use spendwatch::api::{self, AppState};
use spendwatch::config::Config;
use spendwatch::export;
use spendwatch::ingest::{cap_transactions, parse_transactions_csv, Transaction};

const USAGE: &str = "\
Usage:
  spendwatch detect <transactions.csv> [config.toml]
  spendwatch export <transactions.csv> <anomalies.csv> [config.toml]
  spendwatch normalize <raw.csv> <normalized.csv> [config.toml]
  spendwatch serve [config.toml]";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Logs go to stderr so `detect` output stays clean JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "detect" => {
            let input = args.get(2).ok_or_else(|| eyre::eyre!("{}", USAGE))?;
            let config = load_config(args.get(3))?;
            let transactions = load_transactions(input, &config)?;

            let report = AnomalyEngine::new(config.detection).analyze(&transactions);
            serde_json::to_writer_pretty(std::io::stdout(), &report)?;
            println!();
        }
        "export" => {
            let (input, output) = match (args.get(2), args.get(3)) {
                (Some(i), Some(o)) => (i, o),
                _ => return Err(eyre::eyre!("{}", USAGE)),
            };
            let config = load_config(args.get(4))?;
            let transactions = load_transactions(input, &config)?;

            let report = AnomalyEngine::new(config.detection).analyze(&transactions);
            export::export_anomalies(output, &report.anomalies)?;
        }
        "normalize" => {
            let (input, output) = match (args.get(2), args.get(3)) {
                (Some(i), Some(o)) => (i, o),
                _ => return Err(eyre::eyre!("{}", USAGE)),
            };
            let config = load_config(args.get(4))?;
            let transactions = load_transactions(input, &config)?;
            export::export_transactions(output, &transactions)?;
        }
        "serve" => {
            let config = load_config(args.get(2))?;
            run_server(config).await?;
        }
        other => {
            return Err(eyre::eyre!("Unknown command '{}'\n{}", other, USAGE));
        }
    }

    Ok(())
}

fn load_config(path: Option<&String>) -> eyre::Result<Config> {
    let path = path.map(|s| s.as_str()).unwrap_or("config.toml");
    let config = Config::load_or_default(path)?;
    tracing::info!(
        disabled_checks = config.detection.disabled.len(),
        max_transactions = config.ingest.max_transactions,
        "Configuration loaded from {}",
        path
    );
    Ok(config)
}

fn load_transactions(path: &str, config: &Config) -> eyre::Result<Vec<Transaction>> {
    let transactions = parse_transactions_csv(path)?;
    Ok(cap_transactions(transactions, config.ingest.max_transactions))
}

async fn run_server(config: Config) -> eyre::Result<()> {
    if !config.api.enabled {
        tracing::warn!("API disabled in configuration, nothing to serve");
        return Ok(());
    }

    let state = AppState {
        engine: AnomalyEngine::new(config.detection),
        max_transactions: config.ingest.max_transactions,
    };

    tracing::info!("spendwatch started. Press Ctrl+C to stop.");
    api::run(state, &config.api.host, config.api.port, tokio::signal::ctrl_c()).await?;

    tracing::info!("spendwatch stopped gracefully");
    Ok(())
}
