//! Remote link plumbing.
//!
//! - `server`: WebSocket server the remote controller talks to, and the
//!   [`WsLink`](server::WsLink) handle the link task drives
//! - `names`: advertised device names

pub mod names;
pub mod server;
