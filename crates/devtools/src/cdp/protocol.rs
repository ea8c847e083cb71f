//! CDP Protocol Types
//!
//! Wire envelopes plus one typed request/response pair per method we call.
//! Add a method by adding a `Command` impl, not by indexing into `Value`s.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cookies::Cookie;

/// Request ID - monotonically increasing per connection
pub type RequestId = u64;

/// CDP Request sent to browser
#[derive(Debug, Clone, Serialize)]
pub struct CDPRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// CDP Response from browser
#[derive(Debug, Clone, Deserialize)]
pub struct CDPResponse {
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

/// Error object carried by a failed reply
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// CDP Event from browser (no request ID)
#[derive(Debug, Clone, Deserialize)]
pub struct CDPEvent {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Anything the browser may push down the socket
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CDPMessage {
    Response(CDPResponse),
    Event(CDPEvent),
}

/// A CDP method with a typed parameter payload and a typed result.
///
/// The implementor itself is serialized as `params`; a unit struct
/// serializes to `null` and is sent without `params`.
pub trait Command: Serialize {
    const METHOD: &'static str;
    type Response: DeserializeOwned;
}

/// `Network.getAllCookies`
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct GetAllCookies;

#[derive(Debug, Clone, Deserialize)]
pub struct GetAllCookiesResponse {
    pub cookies: Vec<Cookie>,
}

impl Command for GetAllCookies {
    const METHOD: &'static str = "Network.getAllCookies";
    type Response = GetAllCookiesResponse;
}

/// `Network.setCookie` - the cookie's own fields are the params
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct SetCookie<'a> {
    pub cookie: &'a Cookie,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetCookieResponse {
    #[serde(default)]
    pub success: bool,
}

impl Command for SetCookie<'_> {
    const METHOD: &'static str = "Network.setCookie";
    type Response = SetCookieResponse;
}
