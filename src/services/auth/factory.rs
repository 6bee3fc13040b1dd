/// Factory: build the process-wide `IdentityResolver` from application `Config`.
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AuthorityMode, Config, ConfigError};
use crate::services::auth::grpc::GrpcIdentityResolver;
use crate::services::auth::resolver::{DeadlineResolver, IdentityResolver};
use crate::services::auth::static_tokens::StaticIdentityResolver;

/// Must be called from within a tokio runtime (the gRPC channel is lazy).
pub fn build_identity_resolver(
    config: &Config,
) -> Result<Arc<dyn IdentityResolver>, ConfigError> {
    let authority = &config.authority;
    let timeout = Duration::from_millis(authority.timeout_ms);

    let inner: Arc<dyn IdentityResolver> = match authority.mode {
        AuthorityMode::Grpc => {
            let url = authority
                .url
                .as_deref()
                .ok_or(ConfigError::Missing("authority.url"))?;
            let connect_timeout = Duration::from_millis(authority.connect_timeout_ms);

            let grpc = GrpcIdentityResolver::connect_lazy(url, timeout, connect_timeout)
                .map_err(|err| {
                    tracing::error!(error = ?err, url, "invalid token authority endpoint");
                    ConfigError::Invalid("authority.url")
                })?;
            tracing::info!(url, timeout_ms = authority.timeout_ms, "using gRPC token authority");
            Arc::new(grpc)
        }
        AuthorityMode::Static => {
            if config.app_env.is_production() {
                tracing::warn!("static token table enabled in production");
            }
            let table = StaticIdentityResolver::from_config(&authority.tokens);
            tracing::info!(tokens = table.len(), "using static token table");
            Arc::new(table)
        }
    };

    Ok(Arc::new(DeadlineResolver::new(inner, timeout)))
}
