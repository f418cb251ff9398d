//! # Erasure Configuration Validator
//!
//! Command-line tool for checking erasure configuration for an environment
//! before the orchestrator is started with it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use erasure_core::config::{ConfigManager, ErasureConfig};
use erasure_core::orchestration::StepCatalog;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate erasure orchestrator configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: $ERASURE_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load, validate, and print a summary (default)
    Validate,

    /// Print the effective configuration as JSON
    Show,

    /// Print the pipeline steps this configuration produces
    Steps,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = load(&cli).and_then(|config| match cli.command {
        Some(Commands::Show) => show_config(&config),
        Some(Commands::Steps) => show_steps(&config),
        Some(Commands::Validate) | None => show_summary(&cli, &config),
    });

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {e:#}");
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<ErasureConfig> {
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &cli.environment)
        .with_context(|| format!("loading configuration for environment '{}'", cli.environment))?;
    Ok(manager.config().clone())
}

fn show_summary(cli: &Cli, config: &ErasureConfig) -> Result<()> {
    let summary = config.summary();

    println!("🔧 Erasure Configuration");
    println!("Environment: {}", cli.environment);
    if let Some(dir) = &cli.config_dir {
        println!("Config Directory: {}", dir.display());
    }
    println!();
    println!("   ✅ Compliance mode: {}", summary.compliance_mode);
    println!(
        "   ✅ Cooldown / retention / deadline: {} / {} / {} days",
        summary.cooldown_days, summary.retention_days, summary.completion_deadline_days
    );
    println!("   ✅ Reason required: {}", summary.reason_required);
    println!(
        "   ✅ Backup / verification / notifications: {} / {} / {}",
        summary.backup_enabled, summary.verification_enabled, summary.notifications_enabled
    );
    println!(
        "   ✅ Retries: up to {} (base delay {}ms)",
        summary.max_retries, config.retry.base_delay_ms
    );
    println!("   ✅ Queue tick: {}ms", summary.queue_tick_ms);
    println!("\n🎉 Configuration is valid");
    Ok(())
}

fn show_config(config: &ErasureConfig) -> Result<()> {
    let rendered = serde_json::to_string_pretty(config).context("serializing configuration")?;
    println!("{rendered}");
    Ok(())
}

fn show_steps(config: &ErasureConfig) -> Result<()> {
    let catalog = StepCatalog::from_config(&config.pipeline);
    println!("📋 Pipeline steps:");
    for (position, step) in catalog.steps().iter().enumerate() {
        println!(
            "  {}. {:<28} {:<9} timeout {}ms",
            position + 1,
            step.id.as_str(),
            if step.required { "required" } else { "skipped" },
            step.timeout.as_millis()
        );
    }
    Ok(())
}
