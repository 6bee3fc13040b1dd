//! Identity resolver interface.
//!
//! Gates depend only on [`IdentityResolver`]; whether the answer comes from the
//! gRPC authority, a static table or a test double is decided in `factory`.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::services::auth::identity::ResolvedIdentity;

/// Resolver failures.
///
/// `Transport` / `DeadlineExceeded` mean the authority could not answer;
/// the remaining variants mean it answered and the token is not usable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("token authority unreachable: {0}")]
    Transport(String),
    #[error("token authority deadline exceeded")]
    DeadlineExceeded,
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("token authority returned unknown role {0}")]
    UnknownRole(i32),
    #[error("malformed token authority response: {0}")]
    MalformedResponse(&'static str),
}

impl ResolveError {
    /// True when the authority never produced a verdict.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::DeadlineExceeded)
    }
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a raw token. One remote round trip per call, no caching.
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, ResolveError>;
}

/// Bounds any resolver by a deadline.
///
/// Dropping the returned future (client went away, outer request timeout)
/// cancels the inner call as well.
pub struct DeadlineResolver {
    inner: Arc<dyn IdentityResolver>,
    deadline: Duration,
}

impl DeadlineResolver {
    pub fn new(inner: Arc<dyn IdentityResolver>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }
}

#[async_trait]
impl IdentityResolver for DeadlineResolver {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, ResolveError> {
        match tokio::time::timeout(self.deadline, self.inner.resolve(token)).await {
            Ok(res) => res,
            Err(_) => {
                tracing::warn!(
                    deadline = ?self.deadline,
                    "token authority call timed out"
                );
                Err(ResolveError::DeadlineExceeded)
            }
        }
    }
}
