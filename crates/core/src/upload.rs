//! Binary-as-text uploads: base64 payloads and `data:` URLs.
//!
//! Images, brand logos and attached files all travel as base64 text. Every
//! one of them goes through [`validate_upload`] before it is stored so the
//! fixed size cap is enforced in one place.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CoreError;

/// Maximum decoded size of any single upload (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Maximum length of an uploaded file name.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Split a `data:<mime>;base64,<payload>` URL into its MIME type and payload.
///
/// Plain base64 (no `data:` prefix) is returned as-is with no MIME type.
pub fn split_data_url(data: &str) -> (Option<&str>, &str) {
    let Some(rest) = data.strip_prefix("data:") else {
        return (None, data);
    };
    match rest.split_once(',') {
        Some((header, payload)) => {
            let mime = header.strip_suffix(";base64").unwrap_or(header);
            let mime = if mime.is_empty() { None } else { Some(mime) };
            (mime, payload)
        }
        None => (None, rest),
    }
}

/// Estimate the decoded byte length of a base64 payload without decoding it.
fn estimated_decoded_len(payload: &str) -> u64 {
    let significant = payload.bytes().filter(|b| !b.is_ascii_whitespace()).count() as u64;
    let padding = payload
        .trim_end()
        .bytes()
        .rev()
        .take_while(|b| *b == b'=')
        .count() as u64;
    (significant * 3 / 4).saturating_sub(padding)
}

/// Decode a base64 payload (or data URL) and return the decoded size in bytes.
pub fn decoded_size(data: &str) -> Result<u64, CoreError> {
    let (_, payload) = split_data_url(data);
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CoreError::Validation(format!("invalid base64 payload: {e}")))?;
    Ok(bytes.len() as u64)
}

/// Validate an upload and return its decoded size.
///
/// Oversized payloads are rejected from their encoded length alone, before
/// any decoding happens. Payloads under the cap are decoded to verify they
/// are well-formed base64.
pub fn validate_upload(name: &str, data: &str) -> Result<u64, CoreError> {
    if name.len() > MAX_FILE_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "file name must be at most {MAX_FILE_NAME_LEN} characters"
        )));
    }
    let (_, payload) = split_data_url(data);
    if payload.trim().is_empty() {
        return Err(CoreError::Validation(format!("file '{name}' is empty")));
    }

    let estimated = estimated_decoded_len(payload);
    if estimated > MAX_UPLOAD_BYTES {
        return Err(CoreError::FileTooLarge {
            name: name.to_string(),
            size: estimated,
            limit: MAX_UPLOAD_BYTES,
        });
    }

    let size = decoded_size(data)?;
    if size > MAX_UPLOAD_BYTES {
        return Err(CoreError::FileTooLarge {
            name: name.to_string(),
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(size)
}

/// Validate an image upload: same size cap, and a data URL must declare an
/// `image/*` MIME type when it declares one at all.
pub fn validate_image(name: &str, data: &str) -> Result<u64, CoreError> {
    if let (Some(mime), _) = split_data_url(data) {
        if !mime.starts_with("image/") {
            return Err(CoreError::Validation(format!(
                "expected an image, got '{mime}'"
            )));
        }
    }
    validate_upload(name, data)
}

/// Encode raw bytes as plain base64. Used by tests and seeders.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
