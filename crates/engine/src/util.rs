//! Internal helpers for input validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::Validation(format!("invalid {label} id")))
}

pub(crate) fn require_positive(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::Validation(format!("{label} must be > 0")));
    }
    Ok(())
}

/// Trim and collapse inner whitespace; `None` when nothing is left.
pub(crate) fn normalize_display(input: &str) -> Option<String> {
    let mut out = String::new();
    for token in input.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    if out.is_empty() { None } else { Some(out) }
}

/// Canonical lookup key for names typed by humans.
///
/// Accents are stripped, case is folded and runs of punctuation/whitespace
/// become a single space, so `"  José  PÉREZ."` and `"jose perez"` collide.
pub(crate) fn normalize_key(input: &str) -> Option<String> {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let normalized = out.trim();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<(String, String)> {
    let display = normalize_display(value)
        .ok_or_else(|| EngineError::Validation(format!("{label} name must not be empty")))?;
    let key = normalize_key(&display).ok_or_else(|| {
        EngineError::Validation(format!("{label} name must contain letters or digits"))
    })?;
    Ok((display, key))
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
