use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::services::auth::identity::OperatorCtx;

/// Identity attached by the route's gate, if any.
///
/// Never rejects: public routes and anonymous `RoleOrAnonymous` requests
/// yield `None`.
#[derive(Debug, Clone)]
pub struct MaybeOperator(pub Option<OperatorCtx>);

impl<S> FromRequestParts<S> for MaybeOperator
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeOperator(parts.extensions.get::<OperatorCtx>().cloned()))
    }
}
