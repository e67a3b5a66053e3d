//! # PWM HAL Binary
//!
//! Loads the output configuration, allocates a PWM channel for every output
//! and reports the result.
//!
//! # Usage
//!
//! ```bash
//! # Set up outputs with the simulation driver
//! pwm_hal --config config/outputs.toml
//!
//! # Abort on the first failed output and print the usage report as JSON
//! pwm_hal --config config/outputs.toml --fail-fast --report
//!
//! # Verbose logging
//! pwm_hal --config config/outputs.toml -v
//! ```

#![deny(warnings)]

use clap::Parser;
use pwm_common::pwm::consts::{DEFAULT_CONFIG_PATH, PWM_SERVICE_NAME};
use pwm_hal::core::{PwmCore, SetupPolicy};
use pwm_hal::driver_registry::DriverRegistry;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// PWM HAL - dual-subsystem PWM channel allocator
#[derive(Parser, Debug)]
#[command(name = "pwm_hal")]
#[command(version)]
#[command(about = "Allocates LEDC and MCPWM channels for configured PWM outputs")]
#[command(long_about = None)]
struct Args {
    /// Path to the output configuration file (outputs.toml).
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Driver to load. Overrides `driver` in the config file.
    #[arg(short, long)]
    driver: Option<String>,

    /// Abort on the first output that fails to set up
    #[arg(long)]
    fail_fast: bool,

    /// Print the allocator usage report as JSON on stdout
    #[arg(long)]
    report: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("PWM startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config decides the log level, so it is read before tracing exists.
    let config = PwmCore::load_config(&args.config);
    let level = match &config {
        Ok(config) if !args.verbose => Level::from(config.shared.log_level),
        _ if args.verbose => Level::DEBUG,
        _ => Level::INFO,
    };
    setup_tracing(&args, level);
    let config = config?;

    info!("{} v{} starting...", PWM_SERVICE_NAME, env!("CARGO_PKG_VERSION"));

    let registry = DriverRegistry::with_builtin();
    info!("Available drivers: {:?}", registry.list_drivers());

    let mut core = PwmCore::with_registry(config, &registry, args.driver.as_deref())?;

    let policy = if args.fail_fast {
        SetupPolicy::AbortOnFailure
    } else {
        SetupPolicy::ContinueDegraded
    };
    let summary = core.setup_all(policy);
    core.dump_config();

    if args.report {
        println!("{}", serde_json::to_string_pretty(&core.report())?);
    }

    if summary.aborted {
        if let Some(err) = summary.first_error() {
            return Err(err.into());
        }
    }

    info!(
        "PWM setup complete: {} operational, {} failed",
        summary.operational.len(),
        summary.failed.len()
    );
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
