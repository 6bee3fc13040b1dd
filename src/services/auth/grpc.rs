use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::Endpoint;
use tonic::{Code, Status};

use crate::services::auth::identity::{ResolvedIdentity, RoleKind, is_header_safe};
use crate::services::auth::proto::{AdminClient, ParseTokenReq, ParseTokenResp};
use crate::services::auth::resolver::{IdentityResolver, ResolveError};

/// Resolver backed by the remote token authority (`ParseToken` over gRPC).
///
/// The channel connects lazily, so the gateway can start before the
/// authority is reachable; calls made meanwhile fail as `Transport`.
#[derive(Debug, Clone)]
pub struct GrpcIdentityResolver {
    client: AdminClient,
    timeout: Duration,
}

impl GrpcIdentityResolver {
    /// Must be called from within a tokio runtime.
    pub fn connect_lazy(
        url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, tonic::transport::Error> {
        let channel = Endpoint::from_shared(url.to_owned())?
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .connect_lazy();

        Ok(Self {
            client: AdminClient::new(channel),
            timeout,
        })
    }
}

#[async_trait]
impl IdentityResolver for GrpcIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, ResolveError> {
        // Channel clones share the underlying connection
        let mut client = self.client.clone();

        let mut req = tonic::Request::new(ParseTokenReq {
            token: token.to_owned(),
        });
        req.set_timeout(self.timeout);

        let resp = client.parse_token(req).await.map_err(map_status)?;
        into_identity(resp.into_inner())
    }
}

/// Classify an authority failure: explicit verdicts vs. no answer.
pub fn map_status(status: Status) -> ResolveError {
    match status.code() {
        Code::Unauthenticated
        | Code::PermissionDenied
        | Code::InvalidArgument
        | Code::NotFound
        | Code::FailedPrecondition
        | Code::OutOfRange
        | Code::AlreadyExists => ResolveError::Rejected(status.message().to_owned()),
        Code::DeadlineExceeded => ResolveError::DeadlineExceeded,
        code => {
            tracing::warn!(
                code = ?code,
                message = %status.message(),
                "token authority call failed"
            );
            ResolveError::Transport(format!("{code:?}: {}", status.message()))
        }
    }
}

fn into_identity(resp: ParseTokenResp) -> Result<ResolvedIdentity, ResolveError> {
    if resp.user_id.is_empty() {
        return Err(ResolveError::MalformedResponse("empty user id"));
    }
    if !is_header_safe(&resp.user_id) {
        return Err(ResolveError::MalformedResponse("user id is not a valid header value"));
    }
    let role = RoleKind::from_code(resp.user_type)
        .ok_or(ResolveError::UnknownRole(resp.user_type))?;

    Ok(ResolvedIdentity {
        user_id: resp.user_id,
        role,
    })
}
