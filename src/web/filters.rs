//! Custom Askama filters for web templates

use askama::Result;
use std::fmt::Display;

/// Shortens text to at most `max_len` characters, ending with an ellipsis.
pub fn excerpt<T: Display>(value: T, max_len: usize) -> Result<String> {
    let text = value.to_string();
    let text = text.trim();
    if text.chars().count() <= max_len {
        return Ok(text.to_string());
    }
    let cut: String = text.chars().take(max_len.saturating_sub(1)).collect();
    Ok(format!("{}…", cut.trim_end()))
}

/// `YYYY-MM-DD` part of a timestamp.
pub fn short_date<T: Display>(value: T) -> Result<String> {
    Ok(value.to_string().chars().take(10).collect())
}

/// Pluralize filter - returns singular or plural form based on count
pub fn plural<T: Display>(count: T, singular: &str, plural: &str) -> Result<String> {
    if count.to_string() == "1" {
        Ok(singular.to_string())
    } else {
        Ok(plural.to_string())
    }
}
