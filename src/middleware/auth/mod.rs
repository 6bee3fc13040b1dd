pub mod access;
pub mod token;

pub use access::{Gate, apply};
