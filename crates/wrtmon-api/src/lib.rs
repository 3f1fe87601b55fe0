// wrtmon-api: Async Rust client for the OpenWrt ubus JSON-RPC gateway

pub mod error;
pub mod router;
pub mod rpc;
pub mod session;
pub mod transport;

pub use error::Error;
pub use router::models::{
    BandwidthHistory, BandwidthSample, BoardInfo, DeviceIdentity, Direction, ReleaseInfo,
};
pub use router::{Endpoint, Router, UbusRouter};
pub use rpc::{RpcMethod, RpcTransport, UbusStatus};
pub use session::Session;
pub use transport::{TlsMode, TransportConfig};
