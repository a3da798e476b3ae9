use base64::{Engine as _, engine::general_purpose};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded value is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Encode a value for use as a URL path segment and as a cache key.
///
/// The output is URL-safe base64 without padding, so the same string can be
/// embedded in a playback URL and used to look the link up in the cache
/// without decoding it first.
pub fn encode(value: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(value.as_bytes())
}

/// Decode a segment produced by [`encode`].
///
/// Standard-alphabet and padded input is accepted too, since clients build
/// configuration segments with whatever base64 flavour their platform has.
pub fn decode(segment: &str) -> Result<String, EncodingError> {
    let normalized: String = segment
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = general_purpose::URL_SAFE_NO_PAD.decode(normalized.as_bytes())?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_url_safe() {
        let encoded = encode("https://1fichier.com/?abc123&af=99");
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('='));
        assert_eq!(decode(&encoded).unwrap(), "https://1fichier.com/?abc123&af=99");
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode("L1"), encode("L1"));
        assert_ne!(encode("L1"), encode("L2"));
    }

    #[test]
    fn test_decode_accepts_standard_padded() {
        let standard = general_purpose::STANDARD.encode("{\"a\":\"??>\"}");
        assert_eq!(decode(&standard).unwrap(), "{\"a\":\"??>\"}");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not base64 at all!").is_err());
    }
}
