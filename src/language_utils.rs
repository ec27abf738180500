use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for target-language handling
///
/// The provider wire contract carries ISO 639-1 (2-letter) target codes, so
/// everything here normalizes toward that form. 3-letter ISO 639-3 input is
/// accepted and converted when a 2-letter equivalent exists.

/// Validate that a code names a real language the wire contract can carry
pub fn validate_target_language(code: &str) -> Result<()> {
    normalize_to_part1(code).map(|_| ())
}

/// Normalize a language code to ISO 639-1 (2-letter) format
pub fn normalize_to_part1(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();

    if normalized.len() == 2 {
        if Language::from_639_1(&normalized).is_some() {
            return Ok(normalized);
        }
    } else if normalized.len() == 3 {
        if let Some(lang) = Language::from_639_3(&normalized) {
            if let Some(part1) = lang.to_639_1() {
                return Ok(part1.to_string());
            }
            return Err(anyhow!("Language '{}' has no ISO 639-1 code", code));
        }
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Check if two language codes name the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part1(code1), normalize_to_part1(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name for a code
pub fn get_language_name(code: &str) -> Result<String> {
    let part1 = normalize_to_part1(code)?;
    let lang = Language::from_639_1(&part1)
        .ok_or_else(|| anyhow!("Failed to resolve language from code: {}", part1))?;

    Ok(lang.to_name().to_string())
}
