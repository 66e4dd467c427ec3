use std::path::{Path, PathBuf};
use std::process;

use bootlock_core::LicenseVerifier;
use bootlock_core::config::{DEFAULT_MID_KEY, VerifierConfig};
use bootlock_core::sysinfo::{FingerprintProvider, HostFingerprint};
use bootlock_gate::{BootError, BootOutcome, STARTUP_FAILURE_EXIT, gate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::{Builder, Env};
use log::{error, info};

#[derive(Parser)]
#[command(version, about="Offline license gate", long_about = None)]
#[command(propagate_version = true)]
struct Opts {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the local license, exit 1 on a license failure and 2 on any other startup failure
    Check {
        /// Verifier config (JSON)
        #[clap(long)]
        config: PathBuf,
    },
    /// Print this machine's fingerprint, to send to the license issuer
    Fingerprint {
        /// Key mixed into the CPU and mainboard hashes, must match the application's config
        #[clap(long, default_value = DEFAULT_MID_KEY)]
        mid_key: String,
    },
}

fn main() {
    Builder::from_env(Env::default().default_filter_or("info,bootlock_core=debug")).init();

    let opts = Opts::parse();

    match opts.command {
        Commands::Check { config } => check(&config),
        Commands::Fingerprint { mid_key } => fingerprint(&mid_key),
    }
}

fn check(config: &Path) {
    let outcome = gate(|| {
        let config = VerifierConfig::from_file(config)?;
        let verifier = LicenseVerifier::new(config)?;
        verifier.verify()?;
        Ok::<(), BootError>(())
    });

    match outcome {
        BootOutcome::Started => banner(&" LICENSE OK ".white().on_green().to_string()),
        BootOutcome::Reloading => {}
        BootOutcome::Exit(code) => {
            banner(&" LICENSE CHECK FAILED ".white().on_red().to_string());
            process::exit(code);
        }
    }
}

fn fingerprint(mid_key: &str) {
    let fingerprint = HostFingerprint::new(mid_key).fingerprint();

    match serde_json::to_string_pretty(&fingerprint) {
        Ok(json) => {
            info!("Machine fingerprint:");
            println!("{json}");
        }
        Err(e) => {
            error!("Failed to serialize fingerprint: {e}");
            process::exit(STARTUP_FAILURE_EXIT);
        }
    }
}

fn banner(title: &str) {
    info!("{}", "-----------------------------------------------".white().on_blue());
    info!("        {title}");
    info!("{}", "-----------------------------------------------".white().on_blue());
}
