/*
 * Responsibility
 * - middleware の公開インターフェース
 * - auth: token gate per route group
 * - operation_id: operationID required on every business route
 * - cors / http: router-wide layers applied in app.rs
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod operation_id;
