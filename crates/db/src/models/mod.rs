//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts where the API needs one
//! - An update DTO (all `Option` fields) for patches

pub mod attendance;
pub mod audit;
pub mod booking;
pub mod chat;
pub mod leave_request;
pub mod message;
pub mod notification;
pub mod service;
pub mod setting;
pub mod stats;
pub mod task;
pub mod user;
