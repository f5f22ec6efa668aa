//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod attendance_repo;
pub mod audit_repo;
pub mod booking_repo;
pub mod chat_repo;
pub mod leave_request_repo;
pub mod message_repo;
pub mod notification_repo;
pub mod service_repo;
pub mod setting_repo;
pub mod stats_repo;
pub mod task_repo;
pub mod user_repo;

pub use attendance_repo::AttendanceRepo;
pub use audit_repo::AuditLogRepo;
pub use booking_repo::BookingRepo;
pub use chat_repo::ChatRepo;
pub use leave_request_repo::{LeaveRequestRepo, ReviewOutcome};
pub use message_repo::MessageRepo;
pub use notification_repo::NotificationRepo;
pub use service_repo::ServiceRepo;
pub use setting_repo::SettingRepo;
pub use stats_repo::StatsRepo;
pub use task_repo::TaskRepo;
pub use user_repo::UserRepo;
