//! Command line surface and the explicit configuration built from it.

use clap::{ArgGroup, Parser};
use devtools::SessionConfig;
use std::path::PathBuf;
use std::time::Duration;

use crate::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "cdp-cookies")]
#[command(about = "Dump and inject cookies through a Chromium debug port", long_about = None)]
#[command(version)]
#[command(group(
    ArgGroup::new("operation")
        .required(true)
        .multiple(true)
        .args(["dump_cookies", "load_cookies", "dump_pages"])
))]
pub struct Cli {
    /// The debug port the browser is listening on
    #[arg(short, long)]
    pub port: u16,

    /// Host of the debug port
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Dump the cookies to the terminal or the output file
    #[arg(long, visible_alias = "dc")]
    pub dump_cookies: bool,

    /// Load cookies from this file into the browser
    #[arg(long, value_name = "PATH", visible_alias = "lc")]
    pub load_cookies: Option<PathBuf>,

    /// Dump the list of pages to the terminal or the output file
    #[arg(long, visible_alias = "dp")]
    pub dump_pages: bool,

    /// Write the result to this file (always JSON) instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Seconds to wait for discovery, the handshake and each CDP call
    #[arg(long, value_name = "SECS", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Attach to this target id instead of the first listed page
    #[arg(long, value_name = "ID")]
    pub target: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    DumpCookies,
    LoadCookies(PathBuf),
    DumpPages,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::DumpCookies => "dump-cookies",
            Operation::LoadCookies(_) => "load-cookies",
            Operation::DumpPages => "dump-pages",
        }
    }
}

/// Everything a run needs, passed down explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub session: SessionConfig,
    /// In execution order.
    pub operations: Vec<Operation>,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let mut operations = Vec::new();
        if cli.dump_cookies {
            operations.push(Operation::DumpCookies);
        }
        if let Some(path) = cli.load_cookies {
            operations.push(Operation::LoadCookies(path));
        }
        if cli.dump_pages {
            operations.push(Operation::DumpPages);
        }

        Self {
            session: SessionConfig {
                host: cli.host,
                port: cli.port,
                timeout: Duration::from_secs(cli.timeout),
                target: cli.target,
            },
            operations,
            output: cli.output,
            format: cli.format,
        }
    }
}
