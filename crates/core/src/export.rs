//! CSV export of bookings (RFC 4180 quoting, CRLF record separator).

use crate::types::{DbId, Timestamp};

/// Column header of the bookings export.
pub const BOOKING_CSV_HEADER: &[&str] = &[
    "id",
    "customer_name",
    "customer_email",
    "service",
    "status",
    "assigned_staff",
    "scheduled_date",
    "notes",
    "created_at",
];

/// One exported booking.
#[derive(Debug, Clone)]
pub struct BookingCsvRow {
    pub id: DbId,
    pub customer_name: String,
    pub customer_email: String,
    pub service_name: String,
    pub status: String,
    pub assigned_staff: Option<String>,
    pub scheduled_date: Option<Timestamp>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

/// Quote a field when it contains a delimiter, quote, CR or LF.
pub fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render the bookings export including the header record.
pub fn build_bookings_csv(rows: &[BookingCsvRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(BOOKING_CSV_HEADER.join(","));

    for row in rows {
        let fields = [
            row.id.to_string(),
            row.customer_name.clone(),
            row.customer_email.clone(),
            row.service_name.clone(),
            row.status.clone(),
            row.assigned_staff.clone().unwrap_or_default(),
            row.scheduled_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
            row.notes.clone().unwrap_or_default(),
            row.created_at.to_rfc3339(),
        ];
        let escaped: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        lines.push(escaped.join(","));
    }

    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn plain_values_are_not_quoted() {
        assert_eq!(csv_escape("Network Setup"), "Network Setup");
    }

    #[test]
    fn special_characters_are_quoted() {
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line1\nline2"), "\"line1\nline2\"");
        assert_eq!(csv_escape("cr\rhere"), "\"cr\rhere\"");
    }

    #[test]
    fn export_has_header_and_crlf_records() {
        let created = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let rows = vec![BookingCsvRow {
            id: 1,
            customer_name: "Doe, Jane".into(),
            customer_email: "jane@example.com".into(),
            service_name: "Laptop Repair".into(),
            status: "pending".into(),
            assigned_staff: None,
            scheduled_date: None,
            notes: Some("Bring \"charger\"".into()),
            created_at: created,
        }];

        let csv = build_bookings_csv(&rows);
        let expected = "id,customer_name,customer_email,service,status,assigned_staff,scheduled_date,notes,created_at\r\n\
                        1,\"Doe, Jane\",jane@example.com,Laptop Repair,pending,,,\"Bring \"\"charger\"\"\",2026-01-02T03:04:05+00:00\r\n";
        assert_eq!(csv, expected);
    }

    #[test]
    fn empty_export_is_header_only() {
        assert_eq!(build_bookings_csv(&[]).lines().count(), 1);
    }
}
