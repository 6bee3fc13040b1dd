//! Resolved caller identity and its per-request propagation.
//!
//! The gate resolves a token once, then stores an [`OperatorCtx`] in the
//! request extensions. Handlers and the upstream relay read it from there;
//! nothing about the caller lives outside the request.

use std::fmt;

use axum::http::header::InvalidHeaderValue;
use axum::http::{Extensions, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

/// Header / metadata key carrying the operating user's id downstream.
pub const OP_USER_ID: &str = "opUserID";
/// Header / metadata key carrying the operating user's role downstream.
pub const OP_USER_TYPE: &str = "opUserType";
/// Marker key listing which keys are custom routing metadata.
pub const CUSTOM_HEADER: &str = "customHeader";

/// Role as reported by the token authority.
///
/// The authority speaks integers on the wire; everything past the resolver
/// uses this enum. Unknown codes are rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    NormalUser,
    AdminUser,
}

impl RoleKind {
    /// Wire code used by the authority and forwarded downstream.
    pub const fn code(self) -> i32 {
        match self {
            RoleKind::NormalUser => 1,
            RoleKind::AdminUser => 2,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(RoleKind::NormalUser),
            2 => Some(RoleKind::AdminUser),
            _ => None,
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleKind::NormalUser => f.write_str("normal_user"),
            RoleKind::AdminUser => f.write_str("admin_user"),
        }
    }
}

/// Successful verification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user_id: String,
    pub role: RoleKind,
}

/// Identity attached to a request that passed its gate.
///
/// - `role` is the role the gate demanded (or the resolved role for gates
///   that accept any role)
/// - `token` is the verified credential; relayed requests carry exactly this one
#[derive(Clone, PartialEq, Eq)]
pub struct OperatorCtx {
    pub user_id: String,
    pub role: RoleKind,
    pub token: String,
}

impl fmt::Debug for OperatorCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the bearer token
        f.debug_struct("OperatorCtx")
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .finish()
    }
}

impl OperatorCtx {
    /// Role encoded for transport: a single-element list with the role code.
    pub fn op_user_type(&self) -> Vec<String> {
        vec![self.role.code().to_string()]
    }

    /// Keys downstream services should treat as custom routing metadata.
    pub fn custom_header(&self) -> Vec<&'static str> {
        vec![OP_USER_TYPE]
    }

    /// Stamp the identity onto outgoing headers, replacing any prior values.
    ///
    /// All-or-nothing: on error the identity headers are stripped, nothing is
    /// written, and the request must not be relayed.
    pub fn write_headers(&self, headers: &mut HeaderMap) -> Result<(), InvalidHeaderValue> {
        strip_identity_headers(headers);

        let user_id = HeaderValue::from_str(&self.user_id)?;
        let token = HeaderValue::from_str(&self.token)?;
        let roles = self
            .op_user_type()
            .iter()
            .map(|r| HeaderValue::from_str(r))
            .collect::<Result<Vec<_>, _>>()?;

        headers.insert(HeaderName::from_static("opuserid"), user_id);
        for v in roles {
            headers.append(HeaderName::from_static("opusertype"), v);
        }
        for key in self.custom_header() {
            headers.append(
                HeaderName::from_static("customheader"),
                HeaderValue::from_static(key),
            );
        }
        headers.insert(HeaderName::from_static("token"), token);
        Ok(())
    }
}

/// User ids travel downstream as header values, so they must be visible ASCII.
pub fn is_header_safe(user_id: &str) -> bool {
    !user_id.is_empty() && HeaderValue::from_str(user_id).is_ok()
}

/// Remove identity headers a client may have supplied itself.
pub fn strip_identity_headers(headers: &mut HeaderMap) {
    for key in [OP_USER_ID, OP_USER_TYPE, CUSTOM_HEADER] {
        // HeaderMap keys are case-insensitive
        headers.remove(key);
    }
}

/// Attach a verified identity to the request context.
///
/// Stores one `OperatorCtx`, so calling it again with the same arguments
/// leaves the context unchanged.
pub fn propagate(extensions: &mut Extensions, user_id: &str, role: RoleKind, token: &str) {
    extensions.insert(OperatorCtx {
        user_id: user_id.to_owned(),
        role,
        token: token.to_owned(),
    });
}
