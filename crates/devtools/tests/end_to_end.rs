//! Discovery → session → cookie round trips against an in-process fake
//! browser: wiremock for `/json`, a tungstenite server for the target.

use devtools::cookies::{read_cookie_file, validate_cookies, write_cookie_file};
use devtools::{apply_cookies, fetch_all_cookies, BrowserSession, CDPError, SessionConfig};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Every request the fake target saw, in arrival order.
type Seen = Arc<Mutex<Vec<Value>>>;

/// Serve one WebSocket client, answering with `respond(request)`.
async fn fake_target<F>(respond: F) -> (String, Seen)
where
    F: Fn(&Value) -> Value + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            let request: Value = serde_json::from_str(&text).unwrap();
            let mut reply = respond(&request);
            reply["id"] = request["id"].clone();
            log.lock().unwrap().push(request);
            if ws.send(Message::Text(reply.to_string())).await.is_err() {
                break;
            }
        }
    });

    (format!("ws://{}/devtools/page/PAGE1", addr), seen)
}

async fn discovery_for(ws_url: &str) -> (MockServer, SessionConfig) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "PAGE1",
                "title": "Inbox",
                "type": "page",
                "url": "https://mail.example.com/",
                "webSocketDebuggerUrl": ws_url
            },
            {
                "id": "PAGE2",
                "title": "Docs",
                "type": "page",
                "url": "https://docs.example.com/",
                "webSocketDebuggerUrl": "ws://127.0.0.1:1/devtools/page/PAGE2"
            }
        ])))
        .mount(&server)
        .await;

    let config = SessionConfig {
        host: "127.0.0.1".to_string(),
        port: server.address().port(),
        timeout: Duration::from_secs(5),
        target: None,
    };
    (server, config)
}

fn jar() -> Value {
    json!([
        { "name": "SID", "value": "s3cr3t", "domain": ".example.com", "path": "/",
          "expires": 1924992000, "size": 9, "httpOnly": true, "secure": true,
          "session": false, "sameSite": "None", "priority": "High" },
        { "name": "theme", "value": "dark", "domain": "docs.example.com", "path": "/",
          "expires": -1, "size": 9, "httpOnly": false, "secure": false, "session": true }
    ])
}

#[tokio::test]
async fn test_dump_then_load_through_a_file() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let (ws_url, seen) = fake_target(|request| match request["method"].as_str() {
        Some("Network.getAllCookies") => json!({ "result": { "cookies": jar() } }),
        Some("Network.setCookie") => json!({ "result": { "success": true } }),
        _ => json!({ "error": { "code": -32601, "message": "method not found" } }),
    })
    .await;
    let (_server, config) = discovery_for(&ws_url).await;

    let session = BrowserSession::open(&config).await.unwrap();
    assert_eq!(session.target().id, "PAGE1");
    let dumped = fetch_all_cookies(&session).await.unwrap();
    assert_eq!(dumped.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cookies.json");
    write_cookie_file(&file, &dumped).unwrap();

    let records = read_cookie_file(&file).unwrap();
    assert_eq!(validate_cookies(&records).unwrap(), dumped);

    let outcomes = apply_cookies(&session, &records).await.unwrap();
    session.close().await.unwrap();

    assert!(outcomes.iter().all(|o| o.applied));

    let seen = seen.lock().unwrap();
    let methods: Vec<&str> = seen.iter().map(|r| r["method"].as_str().unwrap()).collect();
    assert_eq!(
        methods,
        vec!["Network.getAllCookies", "Network.setCookie", "Network.setCookie"]
    );
    let ids: Vec<u64> = seen.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(seen[1]["params"]["name"], "SID");
    assert_eq!(seen[1]["params"]["sameSite"], "None");
    assert_eq!(seen[2]["params"]["domain"], "docs.example.com");
}

#[tokio::test]
async fn test_explicit_target_that_is_missing() {
    let (ws_url, seen) = fake_target(|_| json!({ "result": {} })).await;
    let (_server, mut config) = discovery_for(&ws_url).await;
    config.target = Some("PAGE9".to_string());

    let err = BrowserSession::open(&config).await.err().unwrap();
    assert!(matches!(err, CDPError::TargetNotFound(_)), "{err:?}");
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_error_reply_aborts_dump() {
    let (ws_url, _seen) = fake_target(|_| {
        json!({ "error": { "code": -32000, "message": "Network domain is disabled" } })
    })
    .await;
    let (_server, config) = discovery_for(&ws_url).await;

    let session = BrowserSession::open(&config).await.unwrap();
    let result = fetch_all_cookies(&session).await;
    session.close().await.unwrap();

    match result {
        Err(CDPError::Protocol { code, message }) => {
            assert_eq!(code, -32000);
            assert_eq!(message, "Network domain is disabled");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
