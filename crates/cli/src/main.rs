mod commands;
mod config;
mod output;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Cli, Config};

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,devtools=debug,cdp_cookies=debug"
    } else {
        "warn,devtools=info,cdp_cookies=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries the report; logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::from(cli);
    if let Err(e) = commands::run(&config).await {
        eprintln!("[-] {:#}", e);
        std::process::exit(1);
    }
}
