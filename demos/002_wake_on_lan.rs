//! Wake a TV that is switched off.
//!
//! Usage:
//!   cargo run --example 002_wake_on_lan -- --mac a8:23:fe:01:9c:ff

mod common;

use std::net::Ipv4Addr;

use common::Args;
use webos_remote::{Error, Result, parse_mac, send_magic_packet};

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
    println!("=== 002: Wake-on-LAN ===\n");

    let mac = args
        .mac
        .ok_or_else(|| Error::config("usage: 002_wake_on_lan --mac <address>"))?;
    let mac = parse_mac(&mac)?;

    send_magic_packet(mac, Ipv4Addr::BROADCAST).await?;
    println!("[WoL] Magic packet sent to {mac}");
    Ok(())
}
