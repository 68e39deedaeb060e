//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Graceful exit handling

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    /// TV host or IP (first positional argument).
    pub host: Option<String>,
    /// MAC address for Wake-on-LAN (`--mac <addr>`).
    pub mac: Option<String>,
    pub debug: bool,
    pub no_wait: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mac = args
            .iter()
            .position(|a| a == "--mac")
            .and_then(|i| args.get(i + 1))
            .cloned();
        Self {
            host: args.iter().find(|a| !a.starts_with("--")).cloned(),
            mac,
            debug: args.iter().any(|a| a == "--debug"),
            no_wait: args.iter().any(|a| a == "--no-wait"),
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Pairing key file next to the working directory.
pub fn key_file() -> PathBuf {
    PathBuf::from("webos-client-key.json")
}

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "webos_remote=debug"
    } else {
        "webos_remote=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Wait for Ctrl+C or skip if `--no-wait` flag is set.
pub async fn wait_for_exit(no_wait: bool) {
    if no_wait {
        println!("[--no-wait] Skipping wait");
        return;
    }

    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();
}
