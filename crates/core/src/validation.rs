//! Helpers for turning `validator` output into a single readable message.

use validator::ValidationErrors;

/// Produce `"<field>: <message>"` for the first failing field.
///
/// Fields are visited in name order so the message is stable across runs.
pub fn first_validation_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, errs) in fields {
        if let Some(err) = errs.first() {
            let detail = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string());
            return format!("{field}: {detail}");
        }
    }
    "Invalid request".to_string()
}
