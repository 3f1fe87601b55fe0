#![allow(clippy::unwrap_used)]
// Integration tests for `UbusRouter` using wiremock.

use std::time::Duration;

use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use wrtmon_api::{Direction, Endpoint, Error, RpcTransport, Router, Session, UbusRouter};

// ── Helpers ─────────────────────────────────────────────────────────

/// Matches a ubus `call` by object and method (and optionally by the
/// session token or the `device` argument).
struct UbusCall {
    subsystem: &'static str,
    operation: &'static str,
    session: Option<&'static str>,
    device: Option<&'static str>,
}

impl UbusCall {
    fn session(mut self, token: &'static str) -> Self {
        self.session = Some(token);
        self
    }

    fn device(mut self, device: &'static str) -> Self {
        self.device = Some(device);
        self
    }
}

impl Match for UbusCall {
    fn matches(&self, request: &Request) -> bool {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return false;
        };
        let params = &body["params"];
        params[1] == self.subsystem
            && params[2] == self.operation
            && self.session.is_none_or(|s| params[0] == s)
            && self.device.is_none_or(|d| params[3]["device"] == d)
    }
}

fn ubus(subsystem: &'static str, operation: &'static str) -> UbusCall {
    UbusCall {
        subsystem,
        operation,
        session: None,
        device: None,
    }
}

fn call(matcher: UbusCall) -> wiremock::MockBuilder {
    Mock::given(method("POST")).and(path("/ubus")).and(matcher)
}

fn reply(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

fn rpc_error(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": -32002, "message": message }
    }))
}

fn login_ok(token: &str) -> Mock {
    call(ubus("session", "login")).respond_with(reply(json!([0, { "ubus_rpc_session": token }])))
}

fn endpoint(server: &MockServer) -> Endpoint {
    Endpoint {
        host: server.uri().trim_start_matches("http://").to_owned(),
        use_tls: false,
        username: "root".into(),
        password: "hunter2".to_string().into(),
        unique_id: "entry-1".into(),
        name: "Office AP".into(),
    }
}

async fn setup() -> (MockServer, UbusRouter) {
    let server = MockServer::start().await;
    let router = UbusRouter::with_client(
        reqwest::Client::new(),
        endpoint(&server),
        Duration::from_secs(5),
    )
    .unwrap();
    (server, router)
}

fn board() -> Value {
    json!([0, {
        "kernel": "5.15.137",
        "hostname": "OpenWrt",
        "system": "ARMv7 Processor rev 5 (v7l)",
        "model": "Linksys E8450",
        "board_name": "linksys,e8450",
        "release": {
            "distribution": "OpenWrt",
            "version": "23.05.2",
            "revision": "r23630-842932a63d",
            "target": "mediatek/mt7622",
            "description": "OpenWrt 23.05.2 r23630-842932a63d"
        }
    }])
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

// ── Session tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_login_uses_anonymous_session_and_credentials() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").expect(1).mount(&server).await;

    router.connect().await.unwrap();
    router.connect().await.unwrap();

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["method"], "call");
    assert_eq!(
        bodies[0]["params"],
        json!([
            "00000000000000000000000000000000",
            "session",
            "login",
            { "username": "root", "password": "hunter2" }
        ])
    );
    assert!(router.session().is_authenticated());
}

#[tokio::test]
async fn test_login_without_token_fails_authentication() {
    let (server, mut router) = setup().await;
    call(ubus("session", "login"))
        .respond_with(reply(json!([6])))
        .mount(&server)
        .await;

    let result = router.connect().await;

    assert!(
        matches!(result, Err(Error::AuthenticationFailed { .. })),
        "expected AuthenticationFailed, got: {result:?}"
    );
    assert!(!router.session().is_authenticated());
}

#[tokio::test]
async fn test_calls_carry_session_token() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("system", "board").session("tok-1"))
        .respond_with(reply(board()))
        .expect(1)
        .mount(&server)
        .await;

    let info = router.device_info().await.unwrap();

    assert_eq!(info.model, "Linksys E8450");
    assert_eq!(info.unique_id, "entry-1");
    assert_eq!(info.name, "Office AP");
    assert_eq!(
        info.sw_version,
        "OpenWrt 23.05.2 r23630-842932a63d(kernel:5.15.137)"
    );
    assert_eq!(info.configuration_url, server.uri());
    assert_eq!(info.hostname.as_deref(), Some("OpenWrt"));

    // Memoized: no second board call.
    let again = router.device_info().await.unwrap();
    assert_eq!(again, info);
}

#[tokio::test]
async fn test_request_ids_increment_and_reset_on_login() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("system", "board"))
        .respond_with(rpc_error("Object not found"))
        .mount(&server)
        .await;

    let _ = router.device_info().await;
    let _ = router.device_info().await;
    router.invalidate_session();
    let _ = router.device_info().await;

    let ids: Vec<u64> = request_bodies(&server)
        .await
        .iter()
        .map(|b| b["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 1, 2]);
}

#[tokio::test]
async fn test_expired_session_is_renewed_once() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").expect(2).mount(&server).await;
    call(ubus("system", "board"))
        .respond_with(rpc_error("Access denied"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    call(ubus("system", "board"))
        .respond_with(reply(board()))
        .mount(&server)
        .await;

    let info = router.device_info().await.unwrap();
    assert_eq!(info.model, "Linksys E8450");
}

#[tokio::test]
async fn test_expired_session_retry_failure_propagates() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").expect(2).mount(&server).await;
    call(ubus("system", "board"))
        .respond_with(rpc_error("Access denied"))
        .expect(2)
        .mount(&server)
        .await;

    let result = router.device_info().await;

    assert!(
        matches!(result, Err(Error::AuthExpired)),
        "expected AuthExpired, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_http_error_is_authentication_failure() {
    let (server, mut router) = setup().await;
    call(ubus("session", "login"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    // Metric calls must not swallow a failed login as "no data".
    let result = router.client_count().await;

    assert!(
        matches!(result, Err(Error::AuthenticationFailed { .. })),
        "expected AuthenticationFailed, got: {result:?}"
    );
}

#[tokio::test]
async fn test_expired_session_retry_returns_retry_error_unchanged() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").expect(2).mount(&server).await;
    call(ubus("system", "board"))
        .respond_with(rpc_error("Access denied"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    call(ubus("system", "board"))
        .respond_with(rpc_error("Object not found"))
        .mount(&server)
        .await;

    let result = router.device_info().await;

    match result {
        Err(Error::Remote { message, .. }) => assert_eq!(message, "Object not found"),
        other => panic!("expected Remote error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_session_list_returns_whole_result() {
    let server = MockServer::start().await;
    login_ok("tok-1").mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/ubus"))
        .and(body_partial_json(json!({ "method": "list", "params": ["tok-1", "system"] })))
        .respond_with(reply(json!({ "system": { "board": {}, "info": {} } })))
        .expect(1)
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let transport =
        RpcTransport::with_client(reqwest::Client::new(), &base, Duration::from_secs(5)).unwrap();
    let mut session = Session::new(transport, "root".into(), "hunter2".to_string().into());

    let objects = session.list("system").await.unwrap();

    assert_eq!(objects, Some(json!({ "system": { "board": {}, "info": {} } })));
    assert!(session.is_authenticated());
}

// ── Transport tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_non_200_is_http_status_error() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("system", "board"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = router.device_info().await;

    assert!(
        matches!(result, Err(Error::HttpStatus { status: 500 })),
        "expected HttpStatus, got: {result:?}"
    );
}

#[tokio::test]
async fn test_slow_router_times_out() {
    let server = MockServer::start().await;
    call(ubus("session", "login"))
        .respond_with(
            reply(json!([0, { "ubus_rpc_session": "tok-1" }])).set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    let mut router = UbusRouter::with_client(
        reqwest::Client::new(),
        endpoint(&server),
        Duration::from_secs(1),
    )
    .unwrap();

    let result = router.connect().await;

    assert!(
        matches!(result, Err(Error::Timeout { timeout_secs: 1 })),
        "expected Timeout after 1s, got: {result:?}"
    );
}

#[tokio::test]
async fn test_non_json_body_with_multibyte_text_is_decode_error() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    let body = format!("{}é<html>gateway error</html>", "a".repeat(199));
    call(ubus("system", "board"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    let result = router.device_info().await;

    match result {
        Err(Error::Deserialization { message, body: raw }) => {
            assert_eq!(raw, body);
            assert!(message.contains(&"a".repeat(199)), "{message}");
            assert!(!message.contains("gateway error"), "{message}");
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_mistyped_payload_keeps_raw_body() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("system", "board"))
        .respond_with(reply(json!([0, 42])))
        .mount(&server)
        .await;

    let result = router.device_info().await;

    match result {
        Err(Error::Deserialization { message, body }) => {
            assert!(message.starts_with("system.board:"), "{message}");
            assert_eq!(body, "42");
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_router_is_transport_error() {
    // Grab a free port, then close it so nothing is listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let endpoint = Endpoint {
        host: format!("127.0.0.1:{port}"),
        use_tls: false,
        username: "root".into(),
        password: "hunter2".to_string().into(),
        unique_id: "entry-1".into(),
        name: "Office AP".into(),
    };
    let mut router =
        UbusRouter::with_client(reqwest::Client::new(), endpoint, Duration::from_secs(2)).unwrap();

    let result = router.client_count().await;

    assert!(
        matches!(result, Err(Error::Transport(_))),
        "expected Transport, got: {result:?}"
    );
}

// ── Client count tests ──────────────────────────────────────────────

#[tokio::test]
async fn test_client_count_sums_wireless_interfaces() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("luci-rpc", "getNetworkDevices"))
        .respond_with(reply(json!([0, {
            "br-lan": { "name": "br-lan", "up": true },
            "phy0-ap0": { "name": "phy0-ap0", "wireless": true, "up": true },
            "phy1-ap0": { "name": "phy1-ap0", "wireless": true, "up": true }
        }])))
        .expect(1)
        .mount(&server)
        .await;
    call(ubus("iwinfo", "assoclist").device("phy0-ap0"))
        .respond_with(reply(json!([0, { "results": [{}, {}] }])))
        .mount(&server)
        .await;
    call(ubus("iwinfo", "assoclist").device("phy1-ap0"))
        .respond_with(reply(json!([0, { "results": [{}] }])))
        .mount(&server)
        .await;

    assert_eq!(router.client_count().await.unwrap(), Some(3));
    assert_eq!(router.client_count().await.unwrap(), Some(3));
    assert_eq!(
        router.wireless_interfaces(),
        Some(&["phy0-ap0".to_owned(), "phy1-ap0".to_owned()][..])
    );
}

#[tokio::test]
async fn test_failing_interface_counts_as_zero() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("luci-rpc", "getNetworkDevices"))
        .respond_with(reply(json!([0, {
            "phy0-ap0": { "name": "phy0-ap0", "wireless": true },
            "phy1-ap0": { "name": "phy1-ap0", "wireless": true }
        }])))
        .mount(&server)
        .await;
    call(ubus("iwinfo", "assoclist").device("phy0-ap0"))
        .respond_with(rpc_error("No such device"))
        .mount(&server)
        .await;
    call(ubus("iwinfo", "assoclist").device("phy1-ap0"))
        .respond_with(reply(json!([0, { "results": [{}, {}, {}] }])))
        .mount(&server)
        .await;

    assert_eq!(router.client_count().await.unwrap(), Some(3));
}

#[tokio::test]
async fn test_unreadable_interface_list_is_absent_and_not_cached() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("luci-rpc", "getNetworkDevices"))
        .respond_with(rpc_error("Object not found"))
        .expect(2)
        .mount(&server)
        .await;

    assert_eq!(router.client_count().await.unwrap(), None);
    assert_eq!(router.client_count().await.unwrap(), None);
    assert_eq!(router.wireless_interfaces(), None);
}

#[tokio::test]
async fn test_empty_wireless_list_is_cached() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("luci-rpc", "getNetworkDevices"))
        .respond_with(reply(json!([0, { "eth0": { "name": "eth0" } }])))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(router.client_count().await.unwrap(), Some(0));
    assert_eq!(router.client_count().await.unwrap(), Some(0));
    assert_eq!(router.wireless_interfaces(), Some(&[][..]));
}

// ── Bandwidth tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_bandwidth_history_and_rate() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("luci", "getRealtimeStats").device("wan"))
        .respond_with(reply(json!([0, {
            "result": [
                [1_700_000_000, 1_000, 10, 2_000, 20],
                [1_700_000_002, 5_000, 30, 2_500, 25]
            ]
        }])))
        .mount(&server)
        .await;

    let history = router.bandwidth("wan").await.unwrap().unwrap();

    assert_eq!(history.samples.len(), 2);
    let down = history.rate(Direction::Download).unwrap();
    let up = history.rate(Direction::Upload).unwrap();
    assert!((down - 2_000.0).abs() < 1e-9);
    assert!((up - 250.0).abs() < 1e-9);

    let bodies = request_bodies(&server).await;
    assert_eq!(
        bodies.last().unwrap()["params"][3],
        json!({ "mode": "interface", "device": "wan" })
    );
}

#[tokio::test]
async fn test_bandwidth_unavailable_is_none() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("luci", "getRealtimeStats"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    assert_eq!(router.bandwidth("wan").await.unwrap(), None);
}

// ── Reboot tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_reboot_success() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("system", "reboot"))
        .respond_with(reply(json!([0])))
        .expect(1)
        .mount(&server)
        .await;

    router.reboot().await.unwrap();
}

#[tokio::test]
async fn test_reboot_errors_propagate() {
    let (server, mut router) = setup().await;
    login_ok("tok-1").mount(&server).await;
    call(ubus("system", "reboot"))
        .respond_with(rpc_error("Permission denied"))
        .mount(&server)
        .await;

    let result = router.reboot().await;

    match result {
        Err(Error::Remote { message, .. }) => assert_eq!(message, "Permission denied"),
        other => panic!("expected Remote error, got: {other:?}"),
    }
}
