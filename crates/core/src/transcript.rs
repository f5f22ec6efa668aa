//! Plain-text chat transcript export.
//!
//! The layout is consumed by downstream tooling, so it is fixed byte for
//! byte: `\n` line endings, a 50-character `=` rule, timestamps in UTC.

use std::fmt::Write;

use crate::types::{DbId, Timestamp};

const RULE: &str = "==================================================";

/// Body used when the requester can see no messages.
pub const EMPTY_TRANSCRIPT_BODY: &str = "No messages in this chat.";

/// Booking and chat facts printed in the transcript header.
#[derive(Debug, Clone)]
pub struct TranscriptHeader {
    pub booking_id: DbId,
    pub service_name: String,
    pub customer_name: String,
    pub booking_status: String,
    pub chat_open: bool,
    pub exported_at: Timestamp,
}

/// A single visible message.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub sent_at: Timestamp,
    pub sender_name: String,
    pub sender_role: String,
    pub content: String,
    pub is_private: bool,
    pub quotation_amount: Option<f64>,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
}

/// Suggested download name for a booking's transcript.
pub fn transcript_filename(booking_id: DbId) -> String {
    format!("chat-transcript-booking-{booking_id}.txt")
}

fn format_time(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Render the transcript. Entries must already be filtered for the
/// requester and sorted chronologically.
pub fn render_transcript(header: &TranscriptHeader, entries: &[TranscriptEntry]) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "CHAT TRANSCRIPT");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Booking ID: {}", header.booking_id);
    let _ = writeln!(out, "Service: {}", header.service_name);
    let _ = writeln!(out, "Customer: {}", header.customer_name);
    let _ = writeln!(out, "Booking Status: {}", header.booking_status);
    let _ = writeln!(
        out,
        "Chat Status: {}",
        if header.chat_open { "Open" } else { "Closed" }
    );
    let _ = writeln!(out, "Exported At: {}", format_time(&header.exported_at));
    let _ = writeln!(out, "{RULE}");
    out.push('\n');

    if entries.is_empty() {
        let _ = writeln!(out, "{EMPTY_TRANSCRIPT_BODY}");
    } else {
        let rendered: Vec<String> = entries.iter().map(render_entry).collect();
        let _ = writeln!(out, "{}", rendered.join("\n\n"));
    }

    out.push('\n');
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "END OF TRANSCRIPT");
    let _ = writeln!(out, "{RULE}");
    out
}

fn render_entry(entry: &TranscriptEntry) -> String {
    let mut tags = String::new();
    if entry.is_private {
        tags.push_str(" [PRIVATE]");
    }
    if let Some(amount) = entry.quotation_amount {
        let _ = write!(tags, " [QUOTATION: {amount:.2}]");
    }
    if let Some(url) = &entry.attachment_url {
        let kind = entry.attachment_type.as_deref().unwrap_or("file");
        let _ = write!(tags, " [ATTACHMENT: {kind} {url}]");
    }

    format!(
        "[{}] {} ({}){}:\n{}",
        format_time(&entry.sent_at),
        entry.sender_name,
        entry.sender_role,
        tags,
        entry.content
    )
}
