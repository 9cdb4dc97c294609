//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- Requires an allow-listed admin.
//! - [`rbac::Authorized`] -- An authenticated user plus their effective permissions.

pub mod auth;
pub mod rbac;
