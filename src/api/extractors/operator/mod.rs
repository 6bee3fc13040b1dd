/*!
 * Operator extractor
 *
 * Responsibility:
 * - gate が request extensions に入れた OperatorCtx を handler に渡す
 * - 型 (OperatorCtx) は services::auth::identity 側で定義
 */

mod core;

pub use self::core::MaybeOperator;
