// Router capability interface
//
// The coordinator talks to routers only through this trait. `UbusRouter`
// is the one implementation today; other dialects slot in beside it.

pub mod models;
pub mod ubus;

use std::future::Future;

use crate::error::Error;
use models::{BandwidthHistory, DeviceIdentity};

pub use ubus::{Endpoint, UbusRouter};

/// Operations a monitored router must support.
///
/// Metric operations (`client_count`, `bandwidth`) return `Ok(None)` when
/// the data is merely unavailable this time (see
/// [`Error::is_partial_data`]) and `Err` only for failures that make the
/// whole refresh meaningless (network down, credentials rejected).
pub trait Router: Send {
    /// Make sure an authenticated session exists.
    fn connect(&mut self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Board identity, fetched once and memoized.
    fn device_info(&mut self) -> impl Future<Output = Result<DeviceIdentity, Error>> + Send;

    /// Number of stations associated across all wireless interfaces.
    fn client_count(&mut self) -> impl Future<Output = Result<Option<u32>, Error>> + Send;

    /// Realtime traffic history for one interface.
    fn bandwidth(
        &mut self,
        interface: &str,
    ) -> impl Future<Output = Result<Option<BandwidthHistory>, Error>> + Send;

    /// Restart the router. Every failure is reported.
    fn reboot(&mut self) -> impl Future<Output = Result<(), Error>> + Send;
}
