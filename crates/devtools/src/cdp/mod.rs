//! CDP (Chrome DevTools Protocol) Client Implementation
//!
//! One WebSocket per target, id-correlated calls, typed commands on top.

pub mod client;
pub mod protocol;
pub mod session;

pub use client::CDPClient;
pub use protocol::{CDPRequest, CDPResponse, Command};
pub use session::{execute, CDPSession};
