//! Text of the external (email / WhatsApp) notifications.

use servicedesk_core::types::{DbId, Timestamp};

use crate::notifier::ExternalNotice;

fn format_schedule(scheduled: Option<Timestamp>) -> String {
    scheduled
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "to be arranged".to_string())
}

/// Sent to the customer after a booking is created.
pub fn booking_confirmation(
    customer_name: &str,
    booking_id: DbId,
    service_name: &str,
    scheduled: Option<Timestamp>,
) -> ExternalNotice {
    ExternalNotice {
        subject: format!("Booking #{booking_id} received: {service_name}"),
        body: format!(
            "Hello {customer_name},\n\n\
             We received your booking #{booking_id} for {service_name}.\n\
             Scheduled: {}\n\n\
             Our team will review it and get back to you in the booking chat.",
            format_schedule(scheduled)
        ),
    }
}

/// Sent to the customer when their booking changes status.
pub fn status_update(
    customer_name: &str,
    booking_id: DbId,
    service_name: &str,
    status: &str,
) -> ExternalNotice {
    ExternalNotice {
        subject: format!("Booking #{booking_id} is now {status}"),
        body: format!(
            "Hello {customer_name},\n\n\
             The status of your booking #{booking_id} ({service_name}) changed to: {status}."
        ),
    }
}

/// Sent to a staff member who received a new task.
pub fn staff_assignment(
    staff_name: &str,
    booking_id: DbId,
    service_name: &str,
    customer_name: &str,
    description: &str,
) -> ExternalNotice {
    let details = if description.trim().is_empty() {
        String::new()
    } else {
        format!("\nTask: {description}")
    };
    ExternalNotice {
        subject: format!("New assignment: booking #{booking_id}"),
        body: format!(
            "Hello {staff_name},\n\n\
             You have been assigned to booking #{booking_id} ({service_name}) \
             for {customer_name}.{details}"
        ),
    }
}

/// Sent to the customer when staff post a quotation in the chat.
pub fn quotation(
    customer_name: &str,
    booking_id: DbId,
    service_name: &str,
    amount: f64,
    note: &str,
) -> ExternalNotice {
    ExternalNotice {
        subject: format!("Quotation for booking #{booking_id}: {amount:.2}"),
        body: format!(
            "Hello {customer_name},\n\n\
             You received a quotation of {amount:.2} for booking #{booking_id} ({service_name}).\n\n\
             {note}\n\n\
             Reply in the booking chat to accept or ask questions."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotation_amount_has_two_decimals() {
        let n = quotation("Jane", 4, "Network Setup", 150.0, "Router + cabling");
        assert_eq!(n.subject, "Quotation for booking #4: 150.00");
        assert!(n.body.contains("Router + cabling"));
    }

    #[test]
    fn unscheduled_booking_says_to_be_arranged() {
        let n = booking_confirmation("Jane", 1, "Laptop Repair", None);
        assert!(n.body.contains("Scheduled: to be arranged"));
    }

    #[test]
    fn assignment_omits_empty_description() {
        let n = staff_assignment("Sam", 2, "Laptop Repair", "Jane", "  ");
        assert!(!n.body.contains("Task:"));
    }
}
