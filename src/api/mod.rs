/*
 * Responsibility
 * - front door ごとの route table (chat / admin)
 * - handlers / extractors の公開
 */
pub mod admin;
pub mod chat;
pub mod extractors;
pub mod handlers;

#[cfg(test)]
pub(crate) mod test_support;
