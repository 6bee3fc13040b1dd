pub mod operator;

pub use operator::MaybeOperator;
