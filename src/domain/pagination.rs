use std::collections::BTreeMap;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::errors::AppError;

/// The metadata store's resume position: an ordered map of key-attribute
/// names to values. Clients only ever see its encoded form.
pub type StoreCursor = BTreeMap<String, String>;

/// Serializes a store cursor into the opaque token handed to clients.
pub fn encode_page_token(cursor: &StoreCursor) -> Result<String, AppError> {
    let bytes = serde_json::to_vec(cursor)
        .map_err(|e| AppError::Internal(format!("failed to serialize page cursor: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Reverses `encode_page_token`. Anything not produced by it is rejected:
/// malformed base64, malformed JSON, a non-object payload, or an empty map
/// all fail closed with the same error.
pub fn decode_page_token(token: &str) -> Result<StoreCursor, AppError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::InvalidPageToken);
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| AppError::InvalidPageToken)?;
    let cursor: StoreCursor =
        serde_json::from_slice(&bytes).map_err(|_| AppError::InvalidPageToken)?;

    if cursor.is_empty() {
        return Err(AppError::InvalidPageToken);
    }
    Ok(cursor)
}
