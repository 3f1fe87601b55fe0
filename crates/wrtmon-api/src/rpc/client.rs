// ubus RPC transport
//
// Frames JSON-RPC envelopes, posts them to `<base>/ubus`, and classifies
// the reply into payload / device error / expired session. Owns the
// request id counter; the session token is passed in by the caller.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::rpc::envelope::{ACCESS_DENIED, RpcMethod, RpcRequest, RpcResponse, UbusStatus};
use crate::transport::TransportConfig;

/// Path of the rpcd JSON-RPC gateway under the router's web root.
pub const RPC_PATH: &str = "ubus";

/// Characters of an undecodable body quoted in the error message.
const BODY_PREVIEW_CHARS: usize = 200;

/// Raw JSON-RPC transport for a single router.
///
/// Not internally synchronized: every call takes `&mut self` so the id
/// counter can only ever be advanced by one in-flight request.
#[derive(Debug)]
pub struct RpcTransport {
    http: reqwest::Client,
    url: Url,
    timeout: Duration,
    next_id: u64,
}

impl RpcTransport {
    /// Create a transport from a `TransportConfig`.
    ///
    /// `base_url` is the router root (e.g. `http://192.168.1.1`).
    pub fn new(base_url: &Url, config: &TransportConfig) -> Result<Self, Error> {
        let http = config.build_client()?;
        Self::with_client(http, base_url, config.timeout)
    }

    /// Create a transport with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &Url,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let base = base_url.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{base}/{RPC_PATH}"))?;
        Ok(Self {
            http,
            url,
            timeout,
            next_id: 1,
        })
    }

    /// Restart the id sequence at 1 (done on every fresh login).
    pub fn reset_ids(&mut self) {
        self.next_id = 1;
    }

    /// Perform one JSON-RPC round trip.
    ///
    /// For [`RpcMethod::Call`] the payload element of `[status, payload]`
    /// is returned (`None` when the procedure returned nothing). For
    /// `get`/`list` the whole `result` is returned. The id counter advances
    /// on every attempt, including failed ones.
    pub async fn call(
        &mut self,
        session: &str,
        method: RpcMethod,
        subsystem: &str,
        operation: Option<&str>,
        args: Option<Value>,
    ) -> Result<Option<Value>, Error> {
        let id = self.next_id;
        self.next_id += 1;

        let request = RpcRequest::new(id, method, session, subsystem, operation, args);
        debug!(
            id,
            %method,
            subsystem,
            operation = operation.unwrap_or("-"),
            "ubus request"
        );

        let response = tokio::time::timeout(self.timeout, self.round_trip(&request))
            .await
            .map_err(|_| self.timeout_error())??;

        trace!(id, reply_id = ?response.id, "ubus response");
        classify(method, response)
    }

    async fn round_trip(&self, request: &RpcRequest) -> Result<RpcResponse, Error> {
        let resp = self
            .http
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| self.reqwest_error(e))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| self.reqwest_error(e))?;

        serde_json::from_str(&body).map_err(|e| {
            let preview = body
                .char_indices()
                .nth(BODY_PREVIEW_CHARS)
                .map_or(body.as_str(), |(end, _)| &body[..end]);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    fn timeout_error(&self) -> Error {
        Error::Timeout {
            timeout_secs: self.timeout.as_secs(),
        }
    }

    fn reqwest_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            self.timeout_error()
        } else {
            Error::Transport(err)
        }
    }
}

/// Turn a decoded envelope into a payload or a classified error.
fn classify(method: RpcMethod, response: RpcResponse) -> Result<Option<Value>, Error> {
    if let Some(err) = response.error {
        let message = err.message.unwrap_or_default();
        if message == ACCESS_DENIED {
            debug!("session rejected by router");
            return Err(Error::AuthExpired);
        }
        return Err(Error::Remote {
            message,
            code: err.code,
        });
    }

    match method {
        RpcMethod::Call => call_payload(response.result),
        RpcMethod::Get | RpcMethod::List => Ok(response.result),
    }
}

/// Extract `payload` from a `[status, payload]` call result.
fn call_payload(result: Option<Value>) -> Result<Option<Value>, Error> {
    let mut items = match result {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(Error::Deserialization {
                message: "call result is not a [status, payload] array".into(),
                body: other.to_string(),
            });
        }
    };

    if let Some(code) = items.first().and_then(Value::as_i64) {
        if code != 0 {
            match UbusStatus::from_code(code) {
                Some(status) => debug!(%status, "ubus call returned non-zero status"),
                None => debug!(code, "ubus call returned unknown status"),
            }
        }
    }

    if items.len() < 2 {
        return Ok(None);
    }
    Ok(Some(items.swap_remove(1)).filter(|payload| !payload.is_null()))
}
