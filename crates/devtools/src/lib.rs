//! Chrome DevTools Protocol client for a browser's local debug port
//!
//! List the port's targets, attach to one over WebSocket, and read or
//! inject the cookies held by the browser's network stack.
//!
//! ```text
//! GET /json → Target → CDPClient (ws) → Network.getAllCookies / Network.setCookie
//! ```

pub mod cdp;
pub mod cookies;
pub mod discovery;
pub mod error;
pub mod session;

pub use cdp::{CDPClient, CDPSession};
pub use cookies::{apply_cookies, fetch_all_cookies, ApplyOutcome, Cookie, CookieRecord};
pub use discovery::{select_target, Target, TargetDirectory};
pub use error::{CDPError, Result};
pub use session::{list_targets, BrowserSession, SessionConfig};
