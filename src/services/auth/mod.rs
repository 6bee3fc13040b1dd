pub mod factory;
pub mod grpc;
pub mod identity;
pub mod proto;
pub mod resolver;
pub mod static_tokens;

pub use factory::build_identity_resolver;
pub use resolver::IdentityResolver;
