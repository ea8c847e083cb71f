//! CDP Session - the "call a method, get its result" seam
//!
//! Cookie operations are written against `CDPSession`, not `CDPClient`,
//! so they run unchanged over a real socket or a scripted double.

use async_trait::async_trait;
use serde_json::Value;

use super::client::CDPClient;
use super::protocol::Command;
use crate::error::{CDPError, Result};

#[async_trait]
pub trait CDPSession: Send + Sync {
    /// Invoke `method` and wait for its correlated reply.
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value>;
}

#[async_trait]
impl CDPSession for CDPClient {
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.send_request(method, params).await
    }
}

/// Send a typed command and decode its typed result.
///
/// A result that does not match the command's response schema is a
/// protocol error, caught here rather than at field access.
pub async fn execute<S, C>(session: &S, command: &C) -> Result<C::Response>
where
    S: CDPSession + ?Sized,
    C: Command,
{
    let params = match serde_json::to_value(command)? {
        Value::Null => None,
        params => Some(params),
    };

    let result = session.call(C::METHOD, params).await?;

    serde_json::from_value(result).map_err(|e| CDPError::InvalidResponse {
        method: C::METHOD.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::protocol::{GetAllCookies, SetCookie};
    use crate::cookies::Cookie;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replies with a fixed result and remembers what it was asked.
    struct FixedReply {
        result: Value,
        seen: Mutex<Vec<(String, Option<Value>)>>,
    }

    impl FixedReply {
        fn new(result: Value) -> Self {
            Self {
                result,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CDPSession for FixedReply {
        async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
            self.seen.lock().unwrap().push((method.to_string(), params));
            Ok(self.result.clone())
        }
    }

    #[tokio::test]
    async fn test_unit_command_sends_no_params() {
        let session = FixedReply::new(json!({ "cookies": [] }));
        let response = execute(&session, &GetAllCookies).await.unwrap();

        assert!(response.cookies.is_empty());
        let seen = session.seen.lock().unwrap();
        assert_eq!(seen[0], ("Network.getAllCookies".to_string(), None));
    }

    #[tokio::test]
    async fn test_cookie_fields_become_params() {
        let cookie: Cookie = serde_json::from_value(json!({
            "name": "sid", "value": "abc", "domain": ".example.com", "path": "/",
            "expires": -1, "httpOnly": true
        }))
        .unwrap();
        let session = FixedReply::new(json!({ "success": true }));

        let response = execute(&session, &SetCookie { cookie: &cookie }).await.unwrap();
        assert!(response.success);

        let seen = session.seen.lock().unwrap();
        let params = seen[0].1.as_ref().unwrap();
        assert_eq!(seen[0].0, "Network.setCookie");
        assert_eq!(params["name"], "sid");
        assert_eq!(params["domain"], ".example.com");
        assert_eq!(params["httpOnly"], true);
    }

    #[tokio::test]
    async fn test_wrong_result_shape_is_invalid_response() {
        let session = FixedReply::new(json!({ "cookies": "nope" }));
        let err = execute(&session, &GetAllCookies).await.unwrap_err();

        match &err {
            CDPError::InvalidResponse { method, .. } => assert_eq!(method, "Network.getAllCookies"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_protocol());
    }
}
