//! Status enums stored as lowercase TEXT columns.
//!
//! Each variant's string form matches the `CHECK` constraint on the
//! corresponding table, so values round-trip between Rust and SQL unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($label:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in lifecycle order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database string for this status.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    other => Err(format!(
                        "Invalid {} '{other}'. Must be one of: {}",
                        $label,
                        [$($val),+].join(", ")
                    )),
                }
            }
        }
    };
}

define_status_enum! {
    /// Booking lifecycle status.
    BookingStatus ("booking status") {
        Pending = "pending",
        Confirmed = "confirmed",
        InProgress = "in_progress",
        Completed = "completed",
        Cancelled = "cancelled",
    }
}

define_status_enum! {
    /// Per-staff task status.
    TaskStatus ("task status") {
        Pending = "pending",
        InProgress = "in_progress",
        Completed = "completed",
    }
}

define_status_enum! {
    /// Leave request review status.
    LeaveStatus ("leave status") {
        Pending = "pending",
        Approved = "approved",
        Rejected = "rejected",
    }
}

define_status_enum! {
    /// Kind of leave being requested. Only annual leave draws on the quota.
    LeaveType ("leave type") {
        Annual = "annual",
        Sick = "sick",
        Unpaid = "unpaid",
    }
}
