//! Shared fixtures for route-table tests: an echoing upstream and a gateway
//! state backed by a static token table.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::config::StaticToken;
use crate::services::auth::identity::RoleKind;
use crate::services::auth::static_tokens::StaticIdentityResolver;
use crate::services::upstream::Upstream;
use crate::state::AppState;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const USER_TOKEN: &str = "user-token";
/// Verifies, but its user id cannot be sent as a header value.
pub const UNFORWARDABLE_TOKEN: &str = "unforwardable-token";
/// Sent by [`call`] unless a test uses [`send`] directly.
pub const OPERATION_ID: &str = "op-test-1";

/// Upstream that answers every request with what it received.
pub async fn spawn_upstream() -> SocketAddr {
    async fn echo(req: Request<Body>) -> Json<Value> {
        let headers = req.headers();
        let all = |key: &str| -> Vec<String> {
            headers
                .get_all(key)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_owned)
                .collect()
        };

        Json(json!({
            "method": req.method().as_str(),
            "path": req.uri().path(),
            "query": req.uri().query(),
            "op_user_id": all("opuserid"),
            "op_user_type": all("opusertype"),
            "custom_header": all("customheader"),
            "token": all("token"),
            "operation_id": all("operationid"),
            "te": all("te"),
            "proxy_authorization": all("proxy-authorization"),
            "x_internal": all("x-internal"),
        }))
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, Router::new().fallback(echo))
            .await
            .unwrap();
    });
    addr
}

pub fn state(upstream: SocketAddr) -> AppState {
    let resolver = StaticIdentityResolver::from_config(&[
        StaticToken {
            token: ADMIN_TOKEN.into(),
            user_id: "imAdmin".into(),
            role: RoleKind::AdminUser,
        },
        StaticToken {
            token: USER_TOKEN.into(),
            user_id: "u1".into(),
            role: RoleKind::NormalUser,
        },
        StaticToken {
            token: UNFORWARDABLE_TOKEN.into(),
            user_id: "用户1".into(),
            role: RoleKind::NormalUser,
        },
    ]);

    AppState::new(
        Arc::new(resolver),
        Upstream::new(&format!("http://{upstream}")).unwrap(),
    )
}

/// Like [`send`], with a valid `operationID` in front of `headers`.
pub async fn call(
    app: Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut all = vec![("operationID", OPERATION_ID)];
    all.extend_from_slice(headers);
    send(app, method, uri, &all).await
}

/// Send exactly `headers` and read the JSON answer.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    let res = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    // 404 / 405 from the router have no body
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
