/*
 * Responsibility
 * - chat API の URL 構造と、route group ごとの token gate
 * - every business route is relayed to the chat service unchanged
 * - business routes require operationID; /health does not
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{forward::forward, health::health};
use crate::middleware::auth::{self, Gate};
use crate::middleware::operation_id;
use crate::services::auth::identity::RoleKind;
use crate::state::AppState;

const PUBLIC: &[&str] = &[
    "/account/code/send",
    "/account/code/verify",
    "/account/login",
    "/account/password/reset",
    "/client_config/get",
    "/application/latest_version",
    "/application/page_versions",
    "/callback/open_im",
];

/// Registration is open, but an admin token registers on someone's behalf.
const ADMIN_OR_ANONYMOUS: &[&str] = &["/account/register"];

const AUTHENTICATED: &[&str] = &[
    "/account/password/change",
    "/user/update",
    "/user/find/public",
    "/user/find/full",
    "/user/search/full",
    "/user/search/public",
    "/user/rtc/get_token",
    "/friend/search",
    "/applet/find",
];

pub fn routes(state: &AppState) -> Router<AppState> {
    let resolver = state.resolver.clone();

    let register = auth::apply(
        relay(ADMIN_OR_ANONYMOUS),
        resolver.clone(),
        Gate::RoleOrAnonymous(RoleKind::AdminUser),
    );
    let authenticated = auth::apply(relay(AUTHENTICATED), resolver, Gate::Authenticated);

    let business = Router::new()
        .merge(relay(PUBLIC))
        .merge(register)
        .merge(authenticated);

    operation_id::apply(business).route("/health", get(health))
}

/// POST routes relayed upstream as-is.
pub(crate) fn relay(paths: &[&str]) -> Router<AppState> {
    paths
        .iter()
        .fold(Router::new(), |router, path| router.route(path, post(forward)))
}
