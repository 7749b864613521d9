//! Identifier rules for annotation groups and ids
//!
//! Group names and annotation ids become archive path segments, so they are
//! restricted to lowercase ASCII letters, digits, `_` and `-`.

use crate::{Result, UmbError};

fn is_id_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
}

/// Whether `id` is a non-empty string over `[a-z0-9_-]`
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(is_id_char)
}

/// Check an id, naming `what` in the error
pub fn validate_id(what: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(UmbError::schema(format!("{what} must not be empty")));
    }
    if !is_valid_id(id) {
        return Err(UmbError::schema(format!(
            "{what} \"{id}\" may only contain a-z, 0-9, '_' and '-'"
        )));
    }
    Ok(())
}

/// Sanitise arbitrary text into an id
///
/// Lowercases, then replaces every character outside `[a-z0-9_-]` with `_`.
pub fn to_valid_id(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if is_id_char(c) { c } else { '_' })
        .collect()
}

/// Sanitise `text` and append `_` until `taken` no longer reports a clash
pub fn to_unique_id(text: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut id = to_valid_id(text);
    while taken(&id) {
        id.push('_');
    }
    id
}
