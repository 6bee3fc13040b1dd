//! Relay to the business service behind a front door.
//!
//! The path and query are kept as-is; only scheme and authority change.
//! Identity headers are always rebuilt from the gate's `OperatorCtx`, never
//! taken from the client. Hop-by-hop headers are dropped in both directions.

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, Request, Uri, header, uri::InvalidUri};
use axum::response::Response;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;

use crate::error::AppError;
use crate::services::auth::identity::{OperatorCtx, strip_identity_headers};

/// Connection-scoped headers (RFC 9110 §7.6.1) plus the legacy `proxy-connection`.
const HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    base: String,
}

impl Upstream {
    /// `base_url` is scheme + authority, optionally with a path prefix.
    pub fn new(base_url: &str) -> Result<Self, InvalidUri> {
        let base = base_url.trim_end_matches('/').to_owned();
        // fail at startup, not on the first request
        base.parse::<Uri>()?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub async fn forward(
        &self,
        mut req: Request<Body>,
        operator: Option<&OperatorCtx>,
    ) -> Result<Response, AppError> {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let uri: Uri = format!("{}{}", self.base, path_and_query)
            .parse()
            .map_err(|err| {
                tracing::warn!(error = ?err, "cannot build upstream uri");
                AppError::Internal
            })?;
        *req.uri_mut() = uri;

        let headers = req.headers_mut();
        strip_hop_by_hop(headers);
        // let the client set Host for the upstream
        headers.remove(header::HOST);
        match operator {
            Some(op) => op.write_headers(headers).map_err(|err| {
                // a gated request is never relayed without its identity
                tracing::error!(
                    error = ?err,
                    user_id = %op.user_id,
                    "cannot encode identity headers"
                );
                AppError::Internal
            })?,
            None => strip_identity_headers(headers),
        }

        let mut res = self.client.request(req).await.map_err(|err| {
            tracing::warn!(error = ?err, upstream = %self.base, "upstream request failed");
            AppError::UpstreamUnavailable
        })?;
        strip_hop_by_hop(res.headers_mut());

        Ok(res.map(Body::new))
    }
}

/// Remove connection-scoped headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}
