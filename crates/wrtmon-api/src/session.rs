// ubus session management
//
// rpcd hands out an opaque `ubus_rpc_session` id from `session.login`.
// Every other call carries that id as its first positional parameter.
// The token is acquired lazily and dropped as soon as the router rejects it.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::Error;
use crate::rpc::envelope::ANONYMOUS_SESSION;
use crate::rpc::{RpcMethod, RpcTransport};

const SESSION_OBJECT: &str = "session";
const LOGIN_METHOD: &str = "login";
const SESSION_FIELD: &str = "ubus_rpc_session";

/// Authenticated ubus session layered on an [`RpcTransport`].
///
/// Holds the credentials and the cached session token. All operations
/// take `&mut self`; callers that share a session across tasks must wrap
/// it (or its owner) in a lock.
pub struct Session {
    transport: RpcTransport,
    username: String,
    password: SecretString,
    token: Option<SecretString>,
}

impl Session {
    pub fn new(transport: RpcTransport, username: String, password: SecretString) -> Self {
        Self {
            transport,
            username,
            password,
            token: None,
        }
    }

    /// Whether a session token is currently cached.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Return the cached token, logging in first if there is none.
    pub async fn ensure(&mut self) -> Result<SecretString, Error> {
        if let Some(ref token) = self.token {
            return Ok(token.clone());
        }
        self.login().await
    }

    /// Forget the cached token so the next call logs in again.
    pub fn invalidate(&mut self) {
        if self.token.take().is_some() {
            debug!("session token invalidated");
        }
    }

    /// Session-scoped `call` of `subsystem.operation(args)`.
    ///
    /// An "Access denied" reply clears the cached token before the
    /// [`Error::AuthExpired`] is returned.
    pub async fn call(
        &mut self,
        subsystem: &str,
        operation: &str,
        args: Option<Value>,
    ) -> Result<Option<Value>, Error> {
        self.dispatch(RpcMethod::Call, subsystem, Some(operation), args)
            .await
    }

    /// Session-scoped `list` of objects matching `pattern`.
    pub async fn list(&mut self, pattern: &str) -> Result<Option<Value>, Error> {
        self.dispatch(RpcMethod::List, pattern, None, None).await
    }

    async fn dispatch(
        &mut self,
        method: RpcMethod,
        subsystem: &str,
        operation: Option<&str>,
        args: Option<Value>,
    ) -> Result<Option<Value>, Error> {
        let token = self.ensure().await?;
        let result = self
            .transport
            .call(token.expose_secret(), method, subsystem, operation, args)
            .await;

        if matches!(result, Err(Error::AuthExpired)) {
            self.invalidate();
        }
        result
    }

    /// Authenticate with `session.login` and cache the returned token.
    ///
    /// Uses the anonymous session id and restarts the request id sequence.
    /// On any failure the session stays unauthenticated. Device-reported
    /// errors are all reported as [`Error::AuthenticationFailed`].
    async fn login(&mut self) -> Result<SecretString, Error> {
        self.token = None;
        self.transport.reset_ids();
        debug!(username = %self.username, "logging in to ubus");

        let args = json!({
            "username": self.username,
            "password": self.password.expose_secret(),
        });

        let payload = match self
            .transport
            .call(
                ANONYMOUS_SESSION,
                RpcMethod::Call,
                SESSION_OBJECT,
                Some(LOGIN_METHOD),
                Some(args),
            )
            .await
        {
            Ok(payload) => payload,
            Err(Error::AuthExpired) => {
                return Err(Error::AuthenticationFailed {
                    message: "login rejected by router (access denied)".into(),
                });
            }
            // A login that merely "returned no data" still leaves us without
            // a session; it must not be mistaken for a missing metric.
            Err(e) if e.is_partial_data() => {
                return Err(Error::AuthenticationFailed {
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let token = payload
            .as_ref()
            .and_then(|p| p.get(SESSION_FIELD))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::AuthenticationFailed {
                message: format!("login response carried no {SESSION_FIELD}"),
            })?;

        let token = SecretString::from(token.to_owned());
        self.token = Some(token.clone());
        debug!("login successful");
        Ok(token)
    }
}
