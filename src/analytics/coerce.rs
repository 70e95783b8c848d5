//! Lossy coercion helpers for untrusted submission fields
//!
//! Clients sync whatever partial state they have, so every field is
//! optional and every coercion is total: bad input becomes a default,
//! never an error. The same string-level helpers are reused when reading
//! the sheet back, because stored cells are just as untrusted as the
//! submission that produced them.

use serde_json::Value;

/// Coerce an arbitrary JSON value to a non-negative finite number.
///
/// Missing, null, empty-string, and unparseable inputs all map to 0.
pub fn coerce_num(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => clamp(n.as_f64().unwrap_or(0.0)),
        Some(Value::String(s)) => parse_cell_num(s),
        // JavaScript's Number(true) is 1
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Coerce an arbitrary JSON value to a string, falling back to `default`
/// when missing, null, or empty.
pub fn coerce_str(value: Option<&Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

/// Like [`coerce_str`], but additionally maps the literal strings
/// `"undefined"` and `"null"` to the default. Serialized client state
/// that was never set round-trips through JavaScript as those literals.
pub fn coerce_identity_str(value: Option<&Value>, default: &str) -> String {
    let s = coerce_str(value, default);
    if s == "undefined" || s == "null" {
        default.to_string()
    } else {
        s
    }
}

/// Decode an affirmative flag: `true`, `"true"` and `"1"` are true,
/// everything else is false.
pub fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim(), "true" | "1"),
        _ => false,
    }
}

/// Parse a stored cell as a non-negative finite number, defaulting to 0.
pub fn parse_cell_num(cell: &str) -> f64 {
    let cell = cell.trim();
    if cell.is_empty() {
        return 0.0;
    }
    cell.parse::<f64>().map(clamp).unwrap_or(0.0)
}

/// Parse a stored cell as an affirmative flag.
pub fn parse_cell_bool(cell: &str) -> bool {
    matches!(cell.trim(), "true" | "1")
}

fn clamp(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Round to `places` decimal places, half away from zero.
pub fn round_to(v: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (v * factor).round() / factor
}

/// Truncate an identity to an 8-character prefix for the public recency
/// view. Anything longer gets an ellipsis marker.
pub fn redact_identity(identity: &str) -> String {
    let mut prefix: String = identity.chars().take(8).collect();
    if identity.chars().count() > 8 {
        prefix.push('…');
    }
    prefix
}
