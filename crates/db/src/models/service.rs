//! Service catalog model and DTOs.

use serde::{Deserialize, Serialize};
use servicedesk_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `services` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Service {
    pub id: DbId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub duration_minutes: Option<i32>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a service.
#[derive(Debug, Deserialize)]
pub struct CreateService {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

/// DTO for updating a service. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateService {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}
