/// Portable text encoding for stored images
///
/// Saved images are kept as self-describing data URIs
/// (`data:image/webp;base64,...`) so a stored record can be handed
/// straight to a display layer or decoded back into bytes for download.
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::{Error, Result};

/// Encode bytes as a `data:` URI with the given MIME type
pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
}

/// Decode a base64 `data:` URI back into its MIME type and bytes
pub fn decode(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::InvalidPayload("missing 'data:' prefix".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::InvalidPayload("missing ',' separator".to_string()))?;

    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::InvalidPayload("payload is not base64 encoded".to_string()))?;

    let bytes = BASE64
        .decode(payload)
        .map_err(|e| Error::InvalidPayload(e.to_string()))?;

    let mime_type = if mime_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        mime_type.to_string()
    };

    Ok((mime_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_self_describing() {
        let uri = encode("image/png", b"abc");
        assert_eq!(uri, "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_decode_restores_bytes() {
        let (mime, bytes) = decode("data:image/jpeg;base64,AAEC").unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(bytes, vec![0, 1, 2]);
    }

    #[test]
    fn test_decode_rejects_non_data_uri() {
        assert!(matches!(
            decode("blob:snap-resize/1"),
            Err(Error::InvalidPayload(_))
        ));
        assert!(decode("data:image/png,plain").is_err());
        assert!(decode("data:image/png;base64,!!!").is_err());
    }
}
