//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireApproved`] -- Requires an approved account (admins always pass).
//! - [`rbac::RequireStaff`] -- Requires an approved `staff` user or an `admin`.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.

pub mod auth;
pub mod rbac;
