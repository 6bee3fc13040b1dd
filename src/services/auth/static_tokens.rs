//! Config-driven token table, for local development and tests.
//!
//! Never talks to the network; every configured token maps to a fixed
//! identity. Unknown tokens are rejected the way the real authority would.
use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::StaticToken;
use crate::services::auth::identity::ResolvedIdentity;
use crate::services::auth::resolver::{IdentityResolver, ResolveError};

#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    tokens: HashMap<String, ResolvedIdentity>,
}

impl StaticIdentityResolver {
    pub fn from_config(tokens: &[StaticToken]) -> Self {
        let tokens = tokens
            .iter()
            .map(|t| {
                (
                    t.token.clone(),
                    ResolvedIdentity {
                        user_id: t.user_id.clone(),
                        role: t.role,
                    },
                )
            })
            .collect();

        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, ResolveError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| ResolveError::Rejected("token not found".to_owned()))
    }
}
