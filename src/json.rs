//! Path-aware JSON decoding for upstream API responses.

/// A decode failure with the JSON path at which it occurred.
#[derive(Debug, thiserror::Error)]
#[error("at path '{path}': {message}")]
pub struct JsonError {
    pub path: String,
    pub message: String,
}

/// Decode `body`, reporting the serde path and a readable type mismatch on failure.
pub fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, JsonError> {
    let jd = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(jd).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.inner();
        let raw = inner.to_string();
        let loc = format!(" at line {} column {}", inner.line(), inner.column());
        let message = parse_type_mismatch(raw.strip_suffix(&loc).unwrap_or(&raw));
        JsonError { path, message }
    })
}

/// Rewrite "invalid type: X, expected Y" as "expected Y, got X".
fn parse_type_mismatch(error_msg: &str) -> String {
    if let Some(rest) = error_msg.strip_prefix("invalid type: ")
        && let Some((actual, expected)) = rest.split_once(", expected ")
    {
        return format!("expected {}, got {}", expected.trim(), actual);
    }
    error_msg.to_string()
}
