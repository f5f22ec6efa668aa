//! Leave request arithmetic and review rules.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::CoreError;
use crate::status::{LeaveStatus, LeaveType};

/// Annual leave days granted to new staff accounts.
pub const DEFAULT_LEAVE_QUOTA: i32 = 12;

/// A staff member's annual leave counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeaveBalance {
    pub total: i32,
    pub used: i32,
    pub remaining: i32,
}

impl LeaveBalance {
    pub fn new(total: i32, used: i32) -> Self {
        Self {
            total,
            used,
            remaining: (total - used).max(0),
        }
    }
}

/// Inclusive number of calendar days covered by a request.
pub fn requested_days(start: NaiveDate, end: NaiveDate) -> Result<i32, CoreError> {
    if end < start {
        return Err(CoreError::Validation(
            "end_date must not be before start_date".into(),
        ));
    }
    Ok((end - start).num_days() as i32 + 1)
}

/// Check that an annual leave request fits in the remaining quota.
/// Other leave types do not draw on the quota.
pub fn ensure_quota(
    leave_type: LeaveType,
    days: i32,
    balance: LeaveBalance,
) -> Result<(), CoreError> {
    if leave_type == LeaveType::Annual && days > balance.remaining {
        return Err(CoreError::DomainRule(format!(
            "Insufficient leave balance: requested {days} day(s), {} remaining",
            balance.remaining
        )));
    }
    Ok(())
}

/// Only pending requests can be reviewed, and only into a final state.
pub fn ensure_reviewable(current: LeaveStatus, decision: LeaveStatus) -> Result<(), CoreError> {
    if decision == LeaveStatus::Pending {
        return Err(CoreError::Validation(
            "Decision must be approved or rejected".into(),
        ));
    }
    if current != LeaveStatus::Pending {
        return Err(CoreError::DomainRule(
            "Leave request has already been reviewed".into(),
        ));
    }
    Ok(())
}

/// Days to add to `leave_quota_used` when a request is approved.
pub fn quota_consumed(leave_type: LeaveType, days: i32) -> i32 {
    if leave_type == LeaveType::Annual {
        days
    } else {
        0
    }
}
