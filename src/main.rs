use std::sync::Arc;

use clap::{Parser, Subcommand};
use printwatch::{
    config::{loader, AppConfig, DiscoverySettings},
    discovery::DiscoveryEngine,
    providers::SystemProber,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs a one-shot discovery scan of an IP range and prints the devices
    /// found.
    Scan(ScanArgs),
    /// Loads and validates the configuration directory.
    CheckConfig {
        /// Path to the configuration directory.
        #[arg(short, long)]
        config_dir: Option<String>,
    },
}

#[derive(Parser, Debug)]
struct ScanArgs {
    /// The IP range to scan: CIDR blocks, dash ranges or single addresses,
    /// comma-separated.
    range: String,
    /// Probe timeout per address, in milliseconds.
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
    /// Maximum concurrent probes.
    #[arg(long, default_value_t = 50)]
    concurrency: usize,
    /// Additional probe attempts per address.
    #[arg(long, default_value_t = 1)]
    retries: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => scan(args).await?,
        Commands::CheckConfig { config_dir } => check_config(config_dir.as_deref())?,
    }

    Ok(())
}

async fn scan(args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = DiscoverySettings {
        ip_range: args.range,
        scan_timeout: std::time::Duration::from_millis(args.timeout_ms),
        max_concurrent_scans: args.concurrency,
        scan_retries: args.retries,
        // One-shot scans have no adapter wired, so fingerprinting is off.
        enable_snmp_fingerprint: false,
        ..Default::default()
    };

    let prober = Arc::new(SystemProber::new()?);
    let engine = DiscoveryEngine::new(prober);
    let cancel = CancellationToken::new();

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let devices = engine.discover(&settings, &cancel).await?;

    if devices.is_empty() {
        println!("No printer-like devices found.");
        return Ok(());
    }

    for device in devices {
        println!(
            "{:<16} {:<24} {:?} confidence {:.2} ports {:?}",
            device.address,
            device.hostname.as_deref().unwrap_or("-"),
            device.device_type,
            device.confidence,
            device.open_ports,
        );
    }

    Ok(())
}

fn check_config(config_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::new(config_dir)?;

    let rules = loader::load_rules(config.rule_config_path.clone())?;
    let recipients = loader::load_recipients(config.recipient_config_path.clone())?;
    let templates = loader::load_templates(config.template_config_path.clone())?;

    println!(
        "Configuration OK: {} rules, {} recipients, {} templates.",
        rules.len(),
        recipients.len(),
        templates.len()
    );
    Ok(())
}
