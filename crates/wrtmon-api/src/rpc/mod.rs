// ubus JSON-RPC plumbing
//
// Envelope framing and the HTTP transport. Session handling lives one
// layer up in `crate::session`.

pub mod client;
pub mod envelope;

pub use client::RpcTransport;
pub use envelope::{RpcMethod, UbusStatus};
