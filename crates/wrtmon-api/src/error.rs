use thiserror::Error;

/// Top-level error type for the `wrtmon-api` crate.
///
/// Covers every failure mode of the ubus gateway: transport, session,
/// device-reported errors, and payload decoding. `wrtmon-core` maps these
/// into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login did not yield a session token (bad credentials, ACL denial).
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The cached session token was rejected ("Access denied").
    #[error("Session expired -- re-authentication required")]
    AuthExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-200 status.
    #[error("ubus gateway returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Remote ──────────────────────────────────────────────────────
    /// Error object reported by the device in the JSON-RPC envelope.
    #[error("ubus error: {message}")]
    Remote { message: String, code: Option<i64> },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The call succeeded but the payload lacked fields we depend on.
    #[error("Unexpected payload from {operation}: {message}")]
    UnexpectedPayload {
        operation: &'static str,
        message: String,
    },
}

impl Error {
    /// Returns `true` if the session token was rejected and a fresh login
    /// might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// Returns `true` if this error only means "no data for this metric".
    ///
    /// Metric operations turn these into absent values; everything else
    /// (connectivity, timeouts, authentication) fails the whole cycle.
    pub fn is_partial_data(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus { .. }
                | Self::Remote { .. }
                | Self::Deserialization { .. }
                | Self::UnexpectedPayload { .. }
        )
    }

    /// Returns `true` if this is a transient error worth retrying on the
    /// next refresh.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::HttpStatus { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn remote_and_status_errors_are_partial_data() {
        assert!(Error::HttpStatus { status: 502 }.is_partial_data());
        assert!(
            Error::Remote {
                message: "Not found".into(),
                code: Some(-32000),
            }
            .is_partial_data()
        );
    }

    #[test]
    fn session_and_timeout_errors_fail_the_cycle() {
        assert!(!Error::AuthExpired.is_partial_data());
        assert!(!Error::Timeout { timeout_secs: 5 }.is_partial_data());
        assert!(
            !Error::AuthenticationFailed {
                message: "no token".into()
            }
            .is_partial_data()
        );
    }

    #[test]
    fn timeouts_and_gateway_statuses_are_transient() {
        assert!(Error::Timeout { timeout_secs: 5 }.is_transient());
        assert!(Error::HttpStatus { status: 503 }.is_transient());
        assert!(!Error::AuthExpired.is_transient());
        assert!(
            !Error::Remote {
                message: "Object not found".into(),
                code: None,
            }
            .is_transient()
        );
    }

    #[test]
    fn only_access_denied_is_auth_expired() {
        assert!(Error::AuthExpired.is_auth_expired());
        assert!(
            !Error::AuthenticationFailed {
                message: "bad password".into()
            }
            .is_auth_expired()
        );
    }
}
