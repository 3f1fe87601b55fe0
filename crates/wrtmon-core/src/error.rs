// ── Core error types ──
//
// User-facing errors from wrtmon-core. Consumers never see HTTP status
// codes or JSON parse failures directly; the `From<wrtmon_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to router at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Router connection timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Router errors ────────────────────────────────────────────────
    #[error("Router reported an error: {message}")]
    Remote { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Action '{action}' is not enabled for this router")]
    ActionDisabled { action: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<wrtmon_api::Error> for CoreError {
    fn from(err: wrtmon_api::Error) -> Self {
        use wrtmon_api::Error as Api;

        match err {
            Api::AuthenticationFailed { message } => CoreError::AuthenticationFailed { message },
            Api::AuthExpired => CoreError::AuthenticationFailed {
                message: "Session expired and could not be renewed".into(),
            },
            // Timeouts arrive as `Api::Timeout` with the configured duration.
            Api::Transport(e) => CoreError::ConnectionFailed {
                url: e
                    .url()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Tls(reason) => CoreError::ConnectionFailed {
                url: "<tls>".into(),
                reason,
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid router address: {e}"),
            },
            Api::Remote { message, .. } => CoreError::Remote { message },
            Api::HttpStatus { status } => CoreError::Remote {
                message: format!("HTTP {status} from ubus gateway"),
            },
            Api::Deserialization { message, .. } => CoreError::Remote {
                message: format!("malformed response: {message}"),
            },
            Api::UnexpectedPayload { operation, message } => CoreError::Remote {
                message: format!("{operation}: {message}"),
            },
        }
    }
}
