//! The three operations: dump cookies, load cookies, dump pages.
//!
//! Each one that needs a WebSocket opens its own session and closes it on
//! every path once it was opened.

use anyhow::Context;
use devtools::cookies::{read_cookie_file, validate_cookies};
use devtools::{apply_cookies, fetch_all_cookies, list_targets, BrowserSession};
use std::path::Path;

use crate::config::{Config, Operation};
use crate::output::{emit, Report};

pub async fn run(config: &Config) -> anyhow::Result<()> {
    for operation in &config.operations {
        tracing::debug!("Running {}", operation.name());
        match operation {
            Operation::DumpCookies => dump_cookies(config).await?,
            Operation::LoadCookies(path) => load_cookies(config, path).await?,
            Operation::DumpPages => dump_pages(config).await?,
        }
    }
    Ok(())
}

async fn open_session(config: &Config, operation: &str) -> anyhow::Result<BrowserSession> {
    BrowserSession::open(&config.session).await.with_context(|| {
        format!(
            "{}: could not attach to the debug port at {}:{}",
            operation, config.session.host, config.session.port
        )
    })
}

async fn close_session(session: BrowserSession) {
    let target = session.target().id.clone();
    if let Err(e) = session.close().await {
        tracing::warn!("Session on target {} did not close cleanly: {}", target, e);
    }
}

pub async fn dump_cookies(config: &Config) -> anyhow::Result<()> {
    let session = open_session(config, "dump-cookies").await?;
    let target = session.target().clone();

    tracing::info!("Fetching all cookies from target {}", target.id);
    let fetched = fetch_all_cookies(&session).await;
    close_session(session).await;

    let cookies = fetched
        .with_context(|| format!("dump-cookies on target {} ({})", target.id, target.url))?;

    emit(Report::Cookies(&cookies), config.format, config.output.as_deref())
}

pub async fn load_cookies(config: &Config, path: &Path) -> anyhow::Result<()> {
    // The file is checked in full before the browser is contacted.
    let records = read_cookie_file(path)
        .and_then(|records| validate_cookies(&records).map(|_| records))
        .with_context(|| format!("load-cookies: {} was rejected", path.display()))?;
    tracing::info!("Loaded {} cookies from {}", records.len(), path.display());

    let session = open_session(config, "load-cookies").await?;
    let target = session.target().clone();

    let applied = apply_cookies(&session, &records).await;
    close_session(session).await;

    let outcomes = applied
        .with_context(|| format!("load-cookies on target {} ({})", target.id, target.url))?;

    emit(Report::Applied(&outcomes), config.format, config.output.as_deref())
}

pub async fn dump_pages(config: &Config) -> anyhow::Result<()> {
    let targets = list_targets(&config.session).await.with_context(|| {
        format!(
            "dump-pages: could not list targets on {}:{}",
            config.session.host, config.session.port
        )
    })?;

    emit(Report::Pages(&targets), config.format, config.output.as_deref())
}
