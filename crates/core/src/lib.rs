//! Domain rules for the service desk: identifiers, errors, status enums and
//! the cross-entity transition functions that keep bookings, chats and tasks
//! consistent. Nothing in this crate performs I/O.

pub mod attendance;
pub mod chat;
pub mod error;
pub mod export;
pub mod leave;
pub mod lifecycle;
pub mod notifications;
pub mod roles;
pub mod status;
pub mod transcript;
pub mod types;
pub mod validation;
