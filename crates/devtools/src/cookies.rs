//! Cookie operations over a CDP session, plus the persisted cookie file.
//!
//! The file format is the `Network.getAllCookies` reply body:
//! `{"result": {"cookies": [ ... ]}}`. A dump can be loaded back as-is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::cdp::protocol::{GetAllCookies, SetCookie};
use crate::cdp::{execute, CDPSession};
use crate::error::{CDPError, Result};

/// Fields `Network.setCookie` cannot do without.
pub const REQUIRED_FIELDS: [&str; 4] = ["name", "value", "domain", "path"];

/// A cookie as the browser's network stack reports it.
///
/// Fields not named here (`size`, `httpOnly`, `sameSite`, ...) ride along
/// in `extra` so nothing is lost between dump and load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An unvalidated cookie entry read from a file.
pub type CookieRecord = Map<String, Value>;

/// Result of one `Network.setCookie` attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub cookie: Cookie,
    pub applied: bool,
    /// Why the call itself failed, when it did.
    pub error: Option<String>,
}

/// `{"result": {"cookies": [...]}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieFile<T = Cookie> {
    pub result: CookieList<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieList<T> {
    pub cookies: Vec<T>,
}

impl<T> CookieFile<T> {
    pub fn new(cookies: Vec<T>) -> Self {
        Self {
            result: CookieList { cookies },
        }
    }

    pub fn into_cookies(self) -> Vec<T> {
        self.result.cookies
    }
}

/// Read every cookie the browser knows about.
pub async fn fetch_all_cookies<S>(session: &S) -> Result<Vec<Cookie>>
where
    S: CDPSession + ?Sized,
{
    let response = execute(session, &GetAllCookies).await?;
    tracing::info!("Browser reported {} cookies", response.cookies.len());
    Ok(response.cookies)
}

/// Check required fields on every record before anything is sent.
pub fn validate_cookies(records: &[CookieRecord]) -> Result<Vec<Cookie>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let missing = REQUIRED_FIELDS
                .iter()
                .find(|field| !record.get(**field).is_some_and(Value::is_string));
            if let Some(field) = missing {
                return Err(CDPError::Validation(format!(
                    "cookie #{} is missing string field `{}`",
                    index + 1,
                    field
                )));
            }

            serde_json::from_value(Value::Object(record.clone())).map_err(|e| {
                CDPError::Validation(format!("cookie #{}: {}", index + 1, e))
            })
        })
        .collect()
}

/// Set each cookie in order, one round trip per cookie.
///
/// Validation failures abort before the first call. After that a rejected
/// cookie, an error reply or a timed-out call is recorded and the loop moves
/// on; only losing the connection stops it.
pub async fn apply_cookies<S>(session: &S, records: &[CookieRecord]) -> Result<Vec<ApplyOutcome>>
where
    S: CDPSession + ?Sized,
{
    let cookies = validate_cookies(records)?;
    let mut outcomes = Vec::with_capacity(cookies.len());

    for cookie in cookies {
        let (applied, error) = match execute(session, &SetCookie { cookie: &cookie }).await {
            Ok(response) => (response.success, None),
            Err(e) if e.is_protocol() || e.is_timeout() => (false, Some(e.to_string())),
            Err(e) => return Err(e),
        };

        if applied {
            tracing::debug!("Set cookie {} for {}", cookie.name, cookie.domain);
        } else {
            tracing::warn!(
                "Browser did not accept cookie {} for {}{}",
                cookie.name,
                cookie.domain,
                error.as_deref().map(|e| format!(": {e}")).unwrap_or_default()
            );
        }

        outcomes.push(ApplyOutcome {
            cookie,
            applied,
            error,
        });
    }

    Ok(outcomes)
}

/// Parse a cookie file body. Anything but the envelope is rejected.
pub fn parse_cookie_file(text: &str) -> Result<Vec<CookieRecord>> {
    serde_json::from_str::<CookieFile<CookieRecord>>(text)
        .map(CookieFile::into_cookies)
        .map_err(|e| {
            CDPError::Validation(format!(
                "expected {{\"result\": {{\"cookies\": [...]}}}}: {}",
                e
            ))
        })
}

pub fn read_cookie_file(path: impl AsRef<Path>) -> Result<Vec<CookieRecord>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| CDPError::io(path, e))?;
    let records = parse_cookie_file(&text)?;
    tracing::debug!("Read {} cookies from {}", records.len(), path.display());
    Ok(records)
}

/// Render cookies as a pretty-printed cookie file body.
pub fn to_cookie_file(cookies: &[Cookie]) -> Result<String> {
    let document = CookieFile::new(cookies.iter().collect::<Vec<_>>());
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn write_cookie_file(path: impl AsRef<Path>, cookies: &[Cookie]) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, to_cookie_file(cookies)?).map_err(|e| CDPError::io(path, e))
}
