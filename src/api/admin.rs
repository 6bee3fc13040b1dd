/*
 * Responsibility
 * - admin API の URL 構造: everything is admin-only except login,
 *   the import template download and the version lookups
 * - business routes require operationID; /health does not
 */
use axum::{Router, routing::get};

use crate::api::chat::relay;
use crate::api::handlers::{forward::forward, health::health};
use crate::middleware::auth::{self, Gate};
use crate::middleware::operation_id;
use crate::services::auth::identity::RoleKind;
use crate::state::AppState;

const PUBLIC: &[&str] = &[
    "/account/login",
    "/application/latest_version",
    "/application/page_versions",
];

const ADMIN_ONLY: &[&str] = &[
    // account
    "/account/update",
    "/account/info",
    "/account/change_password",
    "/account/add_admin",
    "/account/add_user",
    "/account/del_admin",
    "/account/search",
    // user import
    "/user/import/json",
    "/user/import/xlsx",
    "/user/allow_register/get",
    "/user/allow_register/set",
    "/user/password/reset",
    // registration defaults
    "/default/user/add",
    "/default/user/del",
    "/default/user/find",
    "/default/user/search",
    "/default/group/add",
    "/default/group/del",
    "/default/group/find",
    "/default/group/search",
    "/invitation_code/add",
    "/invitation_code/gen",
    "/invitation_code/del",
    "/invitation_code/search",
    "/forbidden/ip/add",
    "/forbidden/ip/del",
    "/forbidden/ip/search",
    "/forbidden/user/add",
    "/forbidden/user/del",
    "/forbidden/user/search",
    "/applet/add",
    "/applet/del",
    "/applet/update",
    "/applet/search",
    "/block/add",
    "/block/del",
    "/block/search",
    "/client_config/get",
    "/client_config/set",
    "/client_config/del",
    "/statistic/new_user_count",
    "/statistic/login_user_count",
    "/application/add_version",
    "/application/update_version",
    "/application/delete_version",
];

pub fn routes(state: &AppState) -> Router<AppState> {
    let admin_only = auth::apply(
        relay(ADMIN_ONLY),
        state.resolver.clone(),
        Gate::Role(RoleKind::AdminUser),
    );

    let business = Router::new()
        .merge(relay(PUBLIC))
        // template download; the POST on the same path is admin-only
        .route("/user/import/xlsx", get(forward))
        .merge(admin_only);

    operation_id::apply(business).route("/health", get(health))
}
