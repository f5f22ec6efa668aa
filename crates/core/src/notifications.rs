//! Well-known notification kind constants.
//!
//! These must match the `chk_notifications_kind` constraint on the
//! `notifications.kind` column.

/// Booking created or its status changed.
pub const KIND_BOOKING: &str = "booking";

/// Task assigned, removed or updated.
pub const KIND_TASK: &str = "task";

/// Account approval and leave review outcomes.
pub const KIND_APPROVAL: &str = "approval";

/// Admin announcement to many users.
pub const KIND_BROADCAST: &str = "broadcast";

/// New chat message.
pub const KIND_MESSAGE: &str = "message";

/// All valid kinds.
pub const VALID_KINDS: &[&str] = &[
    KIND_BOOKING,
    KIND_TASK,
    KIND_APPROVAL,
    KIND_BROADCAST,
    KIND_MESSAGE,
];
