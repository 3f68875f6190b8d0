//! Phone number normalization and strict yes/no parsing.

/// Normalize a phone number to E.164-ish form: ten digits get a `+1`
/// prefix, anything else keeps its own country code.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        format!("+1{digits}")
    } else {
        format!("+{digits}")
    }
}

/// Whether a normalized number carries at least ten digits.
#[must_use]
pub fn is_plausible_phone(normalized: &str) -> bool {
    normalized.chars().filter(char::is_ascii_digit).count() >= 10
}

/// Strict YES/NO parse. Returns `None` for anything else.
#[must_use]
pub fn parse_yes_no(text: &str) -> Option<bool> {
    match text.trim().to_uppercase().as_str() {
        "YES" => Some(true),
        "NO" => Some(false),
        _ => None,
    }
}
