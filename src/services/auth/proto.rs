//! Wire types and client for the token authority's `ParseToken` RPC.
//!
//! Written by hand instead of generated, so the build does not need `protoc`.
//! Field tags must stay in sync with the authority's `admin.proto`.

use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{GrpcMethod, IntoRequest, Response, Status};

const SERVICE: &str = "openim.admin.admin";
const PARSE_TOKEN_PATH: &str = "/openim.admin.admin/ParseToken";

#[derive(Clone, PartialEq, prost::Message)]
pub struct ParseTokenReq {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ParseTokenResp {
    #[prost(string, tag = "1")]
    pub user_id: String,
    #[prost(int32, tag = "2")]
    pub user_type: i32,
}

/// Minimal unary client for the admin service.
#[derive(Debug, Clone)]
pub struct AdminClient {
    inner: tonic::client::Grpc<Channel>,
}

impl AdminClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    pub async fn parse_token(
        &mut self,
        request: impl IntoRequest<ParseTokenReq>,
    ) -> Result<Response<ParseTokenResp>, Status> {
        self.inner
            .ready()
            .await
            .map_err(|e| Status::unavailable(format!("token authority not ready: {e}")))?;

        let codec = tonic_prost::ProstCodec::default();
        let path = PathAndQuery::from_static(PARSE_TOKEN_PATH);
        let mut req = request.into_request();
        req.extensions_mut()
            .insert(GrpcMethod::new(SERVICE, "ParseToken"));
        self.inner.unary(req, path, codec).await
    }
}
