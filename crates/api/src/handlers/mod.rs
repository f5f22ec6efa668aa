pub mod admin;
pub mod attendance;
pub mod auth;
pub mod booking;
pub mod chat;
pub mod leave;
pub mod notification;
pub mod service;
pub mod task;
pub mod upload;
