//! Clock-in/clock-out rules.

use crate::error::CoreError;
use crate::types::Timestamp;

/// Reject a clock-in while a session is still open.
pub fn ensure_can_clock_in(has_open_session: bool) -> Result<(), CoreError> {
    if has_open_session {
        Err(CoreError::DomainRule("Already clocked in".into()))
    } else {
        Ok(())
    }
}

/// Whole minutes worked between clock-in and clock-out.
///
/// A clock-out earlier than the clock-in (clock skew) counts as zero.
pub fn worked_minutes(clock_in: Timestamp, clock_out: Timestamp) -> i32 {
    let minutes = (clock_out - clock_in).num_minutes();
    minutes.clamp(0, i64::from(i32::MAX)) as i32
}
