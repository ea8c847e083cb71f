//! Output presentation: human report or JSON document, to stdout or a file.

use anyhow::Context;
use clap::ValueEnum;
use devtools::cookies::to_cookie_file;
use devtools::{ApplyOutcome, Cookie, Target};
use indexmap::IndexMap;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

const COOKIE_SEPARATOR: &str = "========================================";
const PAGE_SEPARATOR: &str = "----------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Structured data produced by one operation.
#[derive(Debug, Clone, Copy)]
pub enum Report<'a> {
    Cookies(&'a [Cookie]),
    Pages(&'a [Target]),
    Applied(&'a [ApplyOutcome]),
}

#[derive(Serialize)]
struct AppliedEntry<'a> {
    name: &'a str,
    domain: &'a str,
    applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl Report<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Report::Cookies(_) => "cookies",
            Report::Pages(_) => "pages information",
            Report::Applied(_) => "cookie load results",
        }
    }

    /// JSON rendering. Cookie dumps use the cookie file envelope so they
    /// can be fed straight back to `--load-cookies`.
    pub fn to_json(&self) -> anyhow::Result<String> {
        let json = match self {
            Report::Cookies(cookies) => to_cookie_file(cookies)?,
            Report::Pages(targets) => serde_json::to_string_pretty(targets)?,
            Report::Applied(outcomes) => {
                let entries: Vec<AppliedEntry<'_>> = outcomes
                    .iter()
                    .map(|o| AppliedEntry {
                        name: &o.cookie.name,
                        domain: &o.cookie.domain,
                        applied: o.applied,
                        error: o.error.as_deref(),
                    })
                    .collect();
                serde_json::to_string_pretty(&entries)?
            }
        };
        Ok(json)
    }

    pub fn write_human(&self, out: &mut impl Write) -> io::Result<()> {
        match self {
            Report::Cookies(cookies) => write_cookies(cookies, out),
            Report::Pages(targets) => write_pages(targets, out),
            Report::Applied(outcomes) => write_applied(outcomes, out),
        }
    }
}

fn write_cookies(cookies: &[Cookie], out: &mut impl Write) -> io::Result<()> {
    if cookies.is_empty() {
        return writeln!(out, "[+] The browser holds no cookies.");
    }

    let mut by_domain: IndexMap<&str, Vec<&Cookie>> = IndexMap::new();
    for cookie in cookies {
        by_domain.entry(cookie.domain.as_str()).or_default().push(cookie);
    }

    for (domain, domain_cookies) in by_domain {
        writeln!(out, "[+] Domain: {}", domain)?;
        for cookie in domain_cookies {
            writeln!(out, "  [+] Name: {}", cookie.name)?;
            writeln!(out, "  [+] Value: {}", cookie.value)?;
            writeln!(out, "  [+] Path: {}", cookie.path)?;
            match cookie.expires {
                Some(expires) => writeln!(out, "  [+] Expires: {}", expires)?,
                None => writeln!(out, "  [+] Expires: N/A")?,
            }
        }
        writeln!(out, "[+]{}", COOKIE_SEPARATOR)?;
    }
    Ok(())
}

fn write_pages(targets: &[Target], out: &mut impl Write) -> io::Result<()> {
    if targets.is_empty() {
        return writeln!(out, "[+] No pages found.");
    }

    let or_na = |s: &str| if s.is_empty() { "N/A".to_string() } else { s.to_string() };
    for target in targets {
        writeln!(out, "Page ID: {}", target.id)?;
        writeln!(out, "Title: {}", or_na(&target.title))?;
        writeln!(out, "URL: {}", or_na(&target.url))?;
        writeln!(
            out,
            "WebSocket Debugger URL: {}",
            target.web_socket_debugger_url.as_deref().unwrap_or("N/A")
        )?;
        writeln!(out, "{}", PAGE_SEPARATOR)?;
    }
    Ok(())
}

fn write_applied(outcomes: &[ApplyOutcome], out: &mut impl Write) -> io::Result<()> {
    for outcome in outcomes {
        match (outcome.applied, outcome.error.as_deref()) {
            (true, _) => writeln!(out, "[+] Cookie set successfully: {}", outcome.cookie.name)?,
            (false, Some(error)) => writeln!(
                out,
                "[-] Failed to set cookie: {} ({})",
                outcome.cookie.name, error
            )?,
            (false, None) => writeln!(out, "[-] Failed to set cookie: {}", outcome.cookie.name)?,
        }
    }
    let applied = outcomes.iter().filter(|o| o.applied).count();
    writeln!(out, "[+] {}/{} cookies set.", applied, outcomes.len())
}

/// Send a report to its destination. A file always gets JSON.
pub fn emit(report: Report<'_>, format: OutputFormat, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            let mut json = report.to_json()?;
            json.push('\n');
            std::fs::write(path, json)
                .with_context(|| format!("writing {} to {}", report.describe(), path.display()))?;
            tracing::info!("Wrote {} to {}", report.describe(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            match format {
                OutputFormat::Human => report.write_human(&mut out)?,
                OutputFormat::Json => writeln!(out, "{}", report.to_json()?)?,
            }
            out.flush()?;
        }
    }
    Ok(())
}
