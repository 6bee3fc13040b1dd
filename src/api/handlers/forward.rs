/*
 * Responsibility
 * - catch-all handler for every gated / public business route
 * - hands the request and the gate's identity to the upstream relay
 */
use axum::{body::Body, extract::State, http::Request, response::Response};

use crate::api::extractors::MaybeOperator;
use crate::error::AppError;
use crate::state::AppState;

pub async fn forward(
    State(state): State<AppState>,
    MaybeOperator(operator): MaybeOperator,
    req: Request<Body>,
) -> Result<Response, AppError> {
    match &operator {
        Some(op) => {
            tracing::debug!(user_id = %op.user_id, role = %op.role, "relaying as operator")
        }
        None => tracing::debug!("relaying anonymously"),
    }

    state.upstream.forward(req, operator.as_ref()).await
}
