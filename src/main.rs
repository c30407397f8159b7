//! portguard - keeps monitored PipeWire capture ports wired to an allow-list.
//!
//! Any link from a monitored port to a destination outside the allow-list is
//! cut, and the canonical topology is restored.

mod config;
mod error;
mod graph;
mod handoff;
mod patchbay;
mod pipewire;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use crate::config::Config;
use crate::patchbay::Enforcer;
use crate::pipewire::PipeWireClient;

/// Cleared by SIGINT/SIGTERM.
static RUNNING: AtomicBool = AtomicBool::new(true);

/// Enforce an allow-list on monitored PipeWire ports.
#[derive(Parser, Debug)]
#[command(name = "portguard")]
#[command(version)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/portguard/config.json)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

extern "C" fn on_signal(_: libc::c_int) {
    RUNNING.store(false, Ordering::SeqCst);
}

fn install_signal_handlers() {
    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

fn run(args: Args) -> error::Result<()> {
    let config = Config::load(args.config.as_deref())?;

    if args.print_config {
        println!("{}", config.to_json()?);
        return Ok(());
    }

    install_signal_handlers();

    let client = PipeWireClient::open(&config.client_name)?;
    let mut enforcer = Enforcer::new(client, &config)?;
    enforcer.run(&RUNNING);
    enforcer.shutdown()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting portguard");

    if let Err(e) = run(Args::parse()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
