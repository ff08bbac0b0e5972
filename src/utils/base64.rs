use base64::{engine::general_purpose, Engine as _};
use log::trace;

use crate::error::ParseError;

/// Encodes a string to Base64 format.
pub fn base64_encode(input: &str) -> String {
    general_purpose::STANDARD.encode(input)
}

/// Reverses a URL-safe Base64 string to standard Base64 format.
pub fn url_safe_base64_reverse(input: &str) -> String {
    input.replace('-', "+").replace('_', "/")
}

/// Converts a Base64 string to URL-safe Base64 format by replacing specific characters.
pub fn url_safe_base64_apply(input: &str) -> String {
    input
        .replace('+', "-")
        .replace('/', "_")
        .replace('=', "") // Remove padding
}

/// Encodes a string to URL-safe Base64 format.
pub fn url_safe_base64_encode(input: &str) -> String {
    url_safe_base64_apply(&base64_encode(input))
}

/// Pads a Base64 string with `=` up to a multiple of 4.
///
/// Existing padding is dropped first, so over- and under-padded input both
/// come out with the canonical amount.
pub fn pad_base64(input: &str) -> String {
    let mut result = input.trim_end_matches('=').to_string();
    while result.len() % 4 != 0 {
        result.push('=');
    }
    result
}

/// Decodes Base64 text written in either alphabet, with or without padding.
///
/// Whitespace is ignored. The decoded bytes must be UTF-8.
///
/// # Errors
/// Returns [`ParseError::EncodingAmbiguous`] when the input is empty, is not
/// Base64 in any variant or does not decode to text. Callers treat that as
/// "keep the original text".
pub fn decode_base64_lenient(input: &str) -> Result<String, ParseError> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(ParseError::EncodingAmbiguous("empty input".to_string()));
    }

    let padded = pad_base64(&url_safe_base64_reverse(&cleaned));
    let decoded = general_purpose::STANDARD
        .decode(padded.as_bytes())
        .map_err(|e| ParseError::EncodingAmbiguous(format!("{}: {}", cleaned, e)))?;

    match String::from_utf8(decoded) {
        Ok(text) => {
            trace!("Decoded {} base64 bytes", cleaned.len());
            Ok(text)
        }
        Err(_) => Err(ParseError::EncodingAmbiguous(format!(
            "{}: not utf-8",
            cleaned
        ))),
    }
}

/// Decodes a URL-safe Base64 string to its original form.
///
/// Returns an empty string if the input is invalid.
pub fn url_safe_base64_decode(input: &str) -> String {
    decode_base64_lenient(input).unwrap_or_default()
}
