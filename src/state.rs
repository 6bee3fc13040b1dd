/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState), one per front door
 * - resolver is shared by both APIs, upstream differs
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::IdentityResolver;
use crate::services::upstream::Upstream;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn IdentityResolver>,
    pub upstream: Upstream,
}

impl AppState {
    pub fn new(resolver: Arc<dyn IdentityResolver>, upstream: Upstream) -> Self {
        Self { resolver, upstream }
    }
}
