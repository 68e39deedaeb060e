//! Pairing, volume, toast and app listing.
//!
//! Demonstrates:
//! - Pairing with a persisted client key
//! - One-shot requests and a subscription
//! - Commands issued before the TV has accepted pairing
//!
//! Usage:
//!   cargo run --example 001_remote_basics -- 192.168.1.20
//!   cargo run --example 001_remote_basics -- 192.168.1.20 --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use common::Args;
use webos_remote::command::listener;
use webos_remote::{
    AppInfo, Device, Error, FileKeyStore, Launcher, Result, SessionConfig, SessionListener, State,
    ToastControl, VolumeControl,
};

// ============================================================================
// Listener
// ============================================================================

struct PrintStates;

impl SessionListener for PrintStates {
    fn on_state_changed(&self, old: State, new: State) {
        println!("[State] {old} -> {new}");
        if new == State::Registering {
            println!("        Accept the pairing prompt on the TV if it appears");
        }
    }

    fn on_error(&self, message: &str) {
        println!("[Error] {message}");
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 001: Remote Basics ===\n");

    let host = args
        .host
        .ok_or_else(|| Error::config("usage: 001_remote_basics <host>"))?;
    let config = SessionConfig::for_host(host)?;
    let device = Device::new(config, Arc::new(FileKeyStore::open(common::key_file())?))?;
    device.set_listener(Arc::new(PrintStates));
    device.start();

    let tv = device.tv();
    tv.show_toast("Hello from webos-remote", listener(|r| println!("[Toast] {r:?}")));
    tv.get_volume(listener(|r| println!("[Volume] {r:?}")));
    tv.get_app_list(listener(|r: Result<Vec<AppInfo>>| match r {
        Ok(apps) => {
            println!("[Apps] {} installed", apps.len());
            for app in apps.iter().take(10) {
                println!("        {} ({})", app.name.as_deref().unwrap_or("?"), app.id);
            }
        }
        Err(e) => println!("[Apps] {e}"),
    }));
    let _mute = tv.subscribe_mute(listener(|r| println!("[Mute] {r:?}")));

    common::wait_for_exit(args.no_wait).await;
    device.shutdown();
    Ok(())
}
