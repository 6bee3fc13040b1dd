//! Token gate: `token` header → resolver → role check → `OperatorCtx` in extensions.
//!
//! Three variants, attached per route group with [`apply`]:
//! - [`Gate::Authenticated`]: any verified role
//! - [`Gate::Role`]: verified and exactly the given role
//! - [`Gate::RoleOrAnonymous`]: never rejects; attaches the identity only on an
//!   exact role match
//!
//! Rejecting gates short-circuit before the handler runs. The handler only ever
//! sees an `OperatorCtx` that its own gate produced.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::middleware::auth::token;
use crate::services::auth::identity::{RoleKind, propagate};
use crate::services::auth::resolver::{IdentityResolver, ResolveError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Authenticated,
    Role(RoleKind),
    RoleOrAnonymous(RoleKind),
}

#[derive(Clone)]
struct GateState {
    resolver: Arc<dyn IdentityResolver>,
    gate: Gate,
}

/// Put `gate` in front of every route already registered on `router`.
///
/// Uses `route_layer`, so unmatched paths still 404 instead of 401.
pub fn apply<S>(router: Router<S>, resolver: Arc<dyn IdentityResolver>, gate: Gate) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let state = GateState { resolver, gate };
    router.route_layer(middleware::from_fn_with_state(state, gate_middleware))
}

async fn gate_middleware(
    State(state): State<GateState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    check(state.gate, state.resolver.as_ref(), &mut req).await?;
    Ok(next.run(req).await)
}

/// Run one gate against `req`, annotating its extensions on success.
pub async fn check(
    gate: Gate,
    resolver: &dyn IdentityResolver,
    req: &mut Request<Body>,
) -> Result<(), AppError> {
    match gate {
        Gate::Authenticated => require_any_authenticated(resolver, req).await,
        Gate::Role(expected) => require_role(expected, resolver, req).await,
        Gate::RoleOrAnonymous(expected) => {
            require_role_or_anonymous(expected, resolver, req).await;
            Ok(())
        }
    }
}

pub async fn require_any_authenticated(
    resolver: &dyn IdentityResolver,
    req: &mut Request<Body>,
) -> Result<(), AppError> {
    let token = token::extract(req.headers())?;

    let identity = resolver.resolve(&token).await.map_err(|err| {
        log_resolve_error(&err);
        AppError::from(err)
    })?;

    propagate(req.extensions_mut(), &identity.user_id, identity.role, &token);
    Ok(())
}

pub async fn require_role(
    expected: RoleKind,
    resolver: &dyn IdentityResolver,
    req: &mut Request<Body>,
) -> Result<(), AppError> {
    let token = token::extract(req.headers())?;

    let identity = resolver.resolve(&token).await.map_err(|err| {
        log_resolve_error(&err);
        AppError::from(err)
    })?;

    if identity.role != expected {
        tracing::info!(
            user_id = %identity.user_id,
            role = %identity.role,
            expected = %expected,
            "token role mismatch"
        );
        return Err(AppError::RoleMismatch);
    }

    propagate(req.extensions_mut(), &identity.user_id, expected, &token);
    Ok(())
}

/// Best effort: every failure path falls through to an anonymous request.
pub async fn require_role_or_anonymous(
    expected: RoleKind,
    resolver: &dyn IdentityResolver,
    req: &mut Request<Body>,
) {
    let Ok(token) = token::extract(req.headers()) else {
        tracing::debug!("no token, continuing anonymously");
        return;
    };

    match resolver.resolve(&token).await {
        Ok(identity) if identity.role == expected => {
            propagate(req.extensions_mut(), &identity.user_id, expected, &token);
        }
        Ok(identity) => {
            tracing::debug!(
                user_id = %identity.user_id,
                role = %identity.role,
                expected = %expected,
                "role mismatch, continuing anonymously"
            );
        }
        Err(err) => {
            log_resolve_error(&err);
            tracing::info!("token not verified, continuing anonymously");
        }
    }
}

fn log_resolve_error(err: &ResolveError) {
    if err.is_transport() {
        tracing::error!(error = ?err, "token authority unavailable");
        return;
    }
    match err {
        ResolveError::Rejected(msg) => tracing::debug!("token rejected: {msg}"),
        _ => tracing::warn!(error = ?err, "unusable token authority response"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{Json, http::StatusCode, routing::post};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::services::auth::identity::{OperatorCtx, ResolvedIdentity};
    use crate::services::auth::resolver::DeadlineResolver;

    /// Scripted authority; counts how often it was asked.
    #[derive(Default)]
    struct FakeAuthority {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityResolver for FakeAuthority {
        async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // let concurrent requests interleave
            tokio::time::sleep(Duration::from_millis(5)).await;
            match token {
                "admin-token" => Ok(ResolvedIdentity {
                    user_id: "u1".into(),
                    role: RoleKind::AdminUser,
                }),
                "user-token" => Ok(ResolvedIdentity {
                    user_id: "u2".into(),
                    role: RoleKind::NormalUser,
                }),
                "down" => Err(ResolveError::Transport("connection refused".into())),
                "odd-role" => Err(ResolveError::UnknownRole(9)),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(ResolvedIdentity {
                        user_id: "u3".into(),
                        role: RoleKind::AdminUser,
                    })
                }
                _ => Err(ResolveError::Rejected("token not found".into())),
            }
        }
    }

    async fn echo_identity(req: Request<Body>) -> Json<Value> {
        match req.extensions().get::<OperatorCtx>() {
            Some(ctx) => Json(json!({ "user_id": ctx.user_id, "role": ctx.role.code() })),
            None => Json(json!({ "anonymous": true })),
        }
    }

    fn app(gate: Gate, resolver: Arc<dyn IdentityResolver>) -> Router {
        apply(Router::new().route("/gated", post(echo_identity)), resolver, gate)
    }

    async fn send(app: Router, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri("/gated");
        if let Some(t) = token {
            builder = builder.header("token", t);
        }
        let res = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_token_is_rejected_without_calling_the_authority() {
        let fake = Arc::new(FakeAuthority::default());

        for gate in [Gate::Authenticated, Gate::Role(RoleKind::AdminUser)] {
            let (status, body) = send(app(gate, fake.clone()), None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"]["code"], "ARGS_INVALID");
            assert_eq!(
                body["error"]["message"],
                "arguments invalid: token is empty"
            );
        }
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_token_is_tolerated_by_permissive_gate() {
        let fake = Arc::new(FakeAuthority::default());
        let gate = Gate::RoleOrAnonymous(RoleKind::AdminUser);

        let (status, body) = send(app(gate, fake.clone()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "anonymous": true }));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn matching_role_propagates_identity() {
        let fake = Arc::new(FakeAuthority::default());

        let (status, body) = send(
            app(Gate::Role(RoleKind::AdminUser), fake.clone()),
            Some("admin-token"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "user_id": "u1", "role": 2 }));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn any_authenticated_propagates_the_resolved_role() {
        let fake = Arc::new(FakeAuthority::default());

        let (status, body) = send(app(Gate::Authenticated, fake), Some("user-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "user_id": "u2", "role": 1 }));
    }

    #[tokio::test]
    async fn role_mismatch_is_forbidden() {
        let fake = Arc::new(FakeAuthority::default());

        let (status, body) = send(
            app(Gate::Role(RoleKind::AdminUser), fake.clone()),
            Some("user-token"),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "TOKEN_TYPE_ERROR");
        assert_eq!(body["error"]["message"], "token type error");

        // roles are compared exactly, admin does not satisfy a user gate
        let (status, _) = send(
            app(Gate::Role(RoleKind::NormalUser), fake),
            Some("admin-token"),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn permissive_gate_is_anonymous_on_role_mismatch() {
        let fake = Arc::new(FakeAuthority::default());
        let gate = Gate::RoleOrAnonymous(RoleKind::AdminUser);

        let (status, body) = send(app(gate, fake.clone()), Some("user-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "anonymous": true }));

        let (status, body) = send(app(gate, fake), Some("admin-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "user_id": "u1", "role": 2 }));
    }

    #[tokio::test]
    async fn resolver_failures_surface_on_rejecting_gates() {
        let fake = Arc::new(FakeAuthority::default());

        let cases = [
            ("down", StatusCode::SERVICE_UNAVAILABLE, "AUTHORITY_UNAVAILABLE"),
            ("expired", StatusCode::UNAUTHORIZED, "TOKEN_INVALID"),
            ("odd-role", StatusCode::UNAUTHORIZED, "TOKEN_INVALID"),
        ];
        for (token, status, code) in cases {
            let (got, body) = send(app(Gate::Authenticated, fake.clone()), Some(token)).await;
            assert_eq!(got, status, "token {token}");
            assert_eq!(body["error"]["code"], code);
        }
    }

    #[tokio::test]
    async fn resolver_failures_are_swallowed_by_permissive_gate() {
        let fake = Arc::new(FakeAuthority::default());
        let gate = Gate::RoleOrAnonymous(RoleKind::AdminUser);

        for token in ["down", "expired", "odd-role"] {
            let (status, body) = send(app(gate, fake.clone()), Some(token)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "anonymous": true }));
        }
    }

    #[tokio::test]
    async fn authority_deadline_short_circuits() {
        let bounded: Arc<dyn IdentityResolver> = Arc::new(DeadlineResolver::new(
            Arc::new(FakeAuthority::default()),
            Duration::from_millis(50),
        ));

        let (status, body) = send(app(Gate::Authenticated, bounded.clone()), Some("slow")).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["code"], "AUTHORITY_TIMEOUT");

        let gate = Gate::RoleOrAnonymous(RoleKind::AdminUser);
        let (status, body) = send(app(gate, bounded), Some("slow")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "anonymous": true }));
    }

    #[tokio::test]
    async fn stacked_gates_leave_one_identity() {
        let fake: Arc<dyn IdentityResolver> = Arc::new(FakeAuthority::default());

        let router = Router::new().route("/gated", post(echo_identity));
        let router = apply(router, fake.clone(), Gate::Authenticated);
        let router = apply(router, fake, Gate::Role(RoleKind::AdminUser));

        let (status, body) = send(router, Some("admin-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "user_id": "u1", "role": 2 }));
    }

    #[tokio::test]
    async fn concurrent_requests_do_not_share_identity() {
        let fake: Arc<dyn IdentityResolver> = Arc::new(FakeAuthority::default());
        let router = app(Gate::Authenticated, fake);

        let (a, b, c) = tokio::join!(
            send(router.clone(), Some("admin-token")),
            send(router.clone(), Some("user-token")),
            send(router.clone(), None),
        );

        assert_eq!(a.1, json!({ "user_id": "u1", "role": 2 }));
        assert_eq!(b.1, json!({ "user_id": "u2", "role": 1 }));
        assert_eq!(c.0, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_path_is_not_gated() {
        let fake = Arc::new(FakeAuthority::default());
        let res = app(Gate::Authenticated, fake)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
