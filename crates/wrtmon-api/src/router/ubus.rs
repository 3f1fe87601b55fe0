// ubus router client
//
// Domain operations over the rpcd/luci objects, routed through a
// `Session`. Device identity and the wireless interface list are cached
// for the lifetime of the client; everything else is fetched per call.

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::router::Router;
use crate::router::models::{
    AssocList, BandwidthHistory, BoardInfo, DeviceIdentity, NetworkDevices, wireless_names,
};
use crate::rpc::RpcTransport;
use crate::session::Session;
use crate::transport::TransportConfig;

/// Where and as whom to reach a router.
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Host name or address, optionally with `:port`.
    pub host: String,
    /// Use `https` instead of `http`.
    pub use_tls: bool,
    pub username: String,
    pub password: SecretString,
    /// Stable identifier reported in [`DeviceIdentity::unique_id`].
    pub unique_id: String,
    /// Display name reported in [`DeviceIdentity::name`].
    pub name: String,
}

impl Endpoint {
    fn scheme(&self) -> &'static str {
        if self.use_tls { "https" } else { "http" }
    }

    /// Router web root, e.g. `http://192.168.1.1`.
    pub fn base_url(&self) -> Result<Url, Error> {
        Ok(Url::parse(&format!("{}://{}", self.scheme(), self.host))?)
    }

    /// Management URL shown to users (LuCI lives at the web root).
    pub fn configuration_url(&self) -> String {
        format!("{}://{}", self.scheme(), self.host)
    }
}

/// [`Router`] implementation speaking ubus JSON-RPC.
pub struct UbusRouter {
    session: Session,
    unique_id: String,
    name: String,
    configuration_url: String,
    device_info: Option<DeviceIdentity>,
    wireless_interfaces: Option<Vec<String>>,
}

impl UbusRouter {
    /// Create a client, building the HTTP stack from `transport`.
    pub fn new(endpoint: Endpoint, transport: &TransportConfig) -> Result<Self, Error> {
        let rpc = RpcTransport::new(&endpoint.base_url()?, transport)?;
        Ok(Self::from_transport(endpoint, rpc))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        endpoint: Endpoint,
        timeout: std::time::Duration,
    ) -> Result<Self, Error> {
        let rpc = RpcTransport::with_client(http, &endpoint.base_url()?, timeout)?;
        Ok(Self::from_transport(endpoint, rpc))
    }

    fn from_transport(endpoint: Endpoint, rpc: RpcTransport) -> Self {
        let configuration_url = endpoint.configuration_url();
        let Endpoint {
            username,
            password,
            unique_id,
            name,
            ..
        } = endpoint;
        Self {
            session: Session::new(rpc, username, password),
            unique_id,
            name,
            configuration_url,
            device_info: None,
            wireless_interfaces: None,
        }
    }

    /// The session this client drives.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drop the cached session token; the next call logs in again.
    pub fn invalidate_session(&mut self) {
        self.session.invalidate();
    }

    /// Wireless interfaces discovered on the first client count, if any.
    pub fn wireless_interfaces(&self) -> Option<&[String]> {
        self.wireless_interfaces.as_deref()
    }

    // ── Call helpers ─────────────────────────────────────────────────

    /// Session call with one transparent re-login on an expired session.
    ///
    /// If the reissued call fails too, that error is returned as-is.
    async fn call(
        &mut self,
        subsystem: &str,
        operation: &str,
        args: Option<Value>,
    ) -> Result<Option<Value>, Error> {
        match self.session.call(subsystem, operation, args.clone()).await {
            Err(Error::AuthExpired) => {
                debug!(subsystem, operation, "session expired, logging in again");
                self.session.invalidate();
                self.session.call(subsystem, operation, args).await
            }
            other => other,
        }
    }

    /// [`call`](Self::call) and decode the payload.
    async fn call_as<T: DeserializeOwned>(
        &mut self,
        subsystem: &str,
        operation: &str,
        args: Option<Value>,
    ) -> Result<Option<T>, Error> {
        let Some(payload) = self.call(subsystem, operation, args).await? else {
            return Ok(None);
        };
        let body = payload.to_string();
        serde_json::from_value(payload)
            .map(Some)
            .map_err(|e| Error::Deserialization {
                message: format!("{subsystem}.{operation}: {e}"),
                body,
            })
    }

    fn identity_from(&self, board: BoardInfo) -> Result<DeviceIdentity, Error> {
        let missing = |field: &str| Error::UnexpectedPayload {
            operation: "system.board",
            message: format!("missing {field}"),
        };

        let model = board.model.ok_or_else(|| missing("model"))?;
        let kernel = board.kernel.ok_or_else(|| missing("kernel"))?;
        let description = board
            .release
            .and_then(|r| r.description)
            .ok_or_else(|| missing("release.description"))?;

        Ok(DeviceIdentity {
            unique_id: self.unique_id.clone(),
            name: self.name.clone(),
            model,
            sw_version: format!("{description}(kernel:{kernel})"),
            configuration_url: self.configuration_url.clone(),
            hostname: board.hostname,
        })
    }
}

/// Turn "no data" errors into absence; keep fatal ones.
fn absent_on_partial<T>(result: Result<Option<T>, Error>, what: &str) -> Result<Option<T>, Error> {
    match result {
        Err(e) if e.is_partial_data() => {
            warn!(error = %e, what, "data unavailable");
            Ok(None)
        }
        other => other,
    }
}

impl Router for UbusRouter {
    async fn connect(&mut self) -> Result<(), Error> {
        self.session.ensure().await.map(|_| ())
    }

    async fn device_info(&mut self) -> Result<DeviceIdentity, Error> {
        if let Some(ref info) = self.device_info {
            return Ok(info.clone());
        }

        let board: BoardInfo = self
            .call_as("system", "board", None)
            .await?
            .ok_or_else(|| Error::UnexpectedPayload {
                operation: "system.board",
                message: "empty payload".into(),
            })?;

        let identity = self.identity_from(board)?;
        info!(model = %identity.model, version = %identity.sw_version, "identified router");
        self.device_info = Some(identity.clone());
        Ok(identity)
    }

    /// Sums associated stations over every wireless interface.
    ///
    /// An interface whose association list cannot be read counts as zero
    /// rather than voiding the total.
    async fn client_count(&mut self) -> Result<Option<u32>, Error> {
        let interfaces = if let Some(ref names) = self.wireless_interfaces {
            names.clone()
        } else {
            let fetched = self
                .call_as::<NetworkDevices>("luci-rpc", "getNetworkDevices", None)
                .await;
            let Some(devices) = absent_on_partial(fetched, "network devices")? else {
                return Ok(None);
            };
            let names = wireless_names(devices);
            debug!(interfaces = ?names, "cached wireless interfaces");
            self.wireless_interfaces = Some(names.clone());
            names
        };

        let mut total: u32 = 0;
        for device in &interfaces {
            let fetched = self
                .call_as::<AssocList>("iwinfo", "assoclist", Some(json!({ "device": device })))
                .await;
            match absent_on_partial(fetched, "association list")? {
                Some(list) => {
                    let stations = u32::try_from(list.results.len()).unwrap_or(u32::MAX);
                    total = total.saturating_add(stations);
                }
                None => debug!(device, "no association list, counting zero"),
            }
        }

        Ok(Some(total))
    }

    async fn bandwidth(&mut self, interface: &str) -> Result<Option<BandwidthHistory>, Error> {
        let fetched = self
            .call_as::<BandwidthHistory>(
                "luci",
                "getRealtimeStats",
                Some(json!({ "mode": "interface", "device": interface })),
            )
            .await;
        absent_on_partial(fetched, "realtime stats")
    }

    async fn reboot(&mut self) -> Result<(), Error> {
        info!(router = %self.name, "requesting reboot");
        self.call("system", "reboot", None).await.map(|_| ())
    }
}
