use validator::ValidationErrors;

/// Flattens `validator` errors into a single `; `-separated message.
///
/// Only errors that carry an explicit `message` are included, so every
/// validated field should declare one.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|errs| {
            errs.iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        })
        .collect();
    messages.sort();
    messages.join("; ")
}
