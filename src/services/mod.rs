pub mod auth;
pub mod upstream;
