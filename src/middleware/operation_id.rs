//! `operationID` header: every business request carries a client-chosen id
//! that ties its gateway logs to the downstream service's logs.
//!
//! Requests without one are rejected before any token gate runs. The header
//! itself is left in place, so the relay forwards it unchanged.

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;

/// Lowercase form of `operationID`; `HeaderMap` lookups are case-insensitive.
pub const OPERATION_ID_HEADER: &str = "operationid";

/// Require `operationID` on every route already registered on `router`.
///
/// Apply after the token gates so it runs first.
pub fn apply<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn(require_operation_id))
}

async fn require_operation_id(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    if let Err(err) = extract(req.headers()) {
        tracing::info!(path = %req.uri().path(), "request without operationID");
        return Err(err);
    }
    Ok(next.run(req).await)
}

/// Read the operation id. Absent, blank and non-UTF-8 values are rejected.
pub fn extract(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(OPERATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.trim().is_empty())
        .ok_or(AppError::MissingOperationId)
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, StatusCode};
    use axum::routing::post;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        apply(Router::new().route("/user/update", post(|| async { "relayed" })))
    }

    async fn send(header: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::post("/user/update");
        if let Some(id) = header {
            builder = builder.header("operationID", id);
        }
        let res = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    #[test]
    fn header_name_is_case_insensitive() {
        let mut h = HeaderMap::new();
        h.insert("OperationID", HeaderValue::from_static("op-1"));
        assert_eq!(extract(&h).unwrap(), "op-1");
    }

    #[test]
    fn blank_and_non_utf8_are_missing() {
        assert!(matches!(
            extract(&HeaderMap::new()),
            Err(AppError::MissingOperationId)
        ));

        let mut h = HeaderMap::new();
        h.insert("operationID", HeaderValue::from_static("  "));
        assert!(matches!(extract(&h), Err(AppError::MissingOperationId)));

        let mut h = HeaderMap::new();
        h.insert("operationID", HeaderValue::from_bytes(&[0xff]).unwrap());
        assert!(matches!(extract(&h), Err(AppError::MissingOperationId)));
    }

    #[tokio::test]
    async fn missing_operation_id_is_rejected() {
        let (status, bytes) = send(None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "ARGS_INVALID");
        assert_eq!(
            body["error"]["message"],
            "arguments invalid: header must have operationID"
        );

        let (status, _) = send(Some("")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn present_operation_id_passes_through() {
        let (status, bytes) = send(Some("op-1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"relayed");
    }

    #[tokio::test]
    async fn unknown_path_is_still_not_found() {
        let res = app()
            .oneshot(Request::post("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
