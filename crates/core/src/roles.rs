//! Well-known role name constants.
//!
//! These must match the `chk_users_role` constraint in
//! `20260301000001_create_users.sql`.

pub const ROLE_CUSTOMER: &str = "customer";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_ADMIN: &str = "admin";

/// All valid role names.
pub const VALID_ROLES: &[&str] = &[ROLE_CUSTOMER, ROLE_STAFF, ROLE_ADMIN];

/// Staff and admins act on the service side of a booking.
pub fn is_service_side(role: &str) -> bool {
    role == ROLE_STAFF || role == ROLE_ADMIN
}

/// Validate that a role string is one of the accepted values.
pub fn validate_role(role: &str) -> Result<(), String> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        ))
    }
}
