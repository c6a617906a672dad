//! Decoded inference image frames.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine;

/// One decoded binary image.
///
/// `sequence` is the per-device arrival number (1-based); the legacy
/// binary slot numbers its frames independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    pub sequence: u64,
    pub data: Arc<[u8]>,
}

impl ImageFrame {
    pub fn new(sequence: u64, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            sequence,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Result of decoding a base64 image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Decoded(Vec<u8>),
    DecodeFailed(String),
}

/// Decodes a base64 (standard alphabet) image payload.
///
/// A `data:<mime>;base64,` prefix is tolerated. Never panics.
pub fn decode_image(encoded: &str) -> DecodeOutcome {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };

    match Base64.decode(payload.trim()) {
        Ok(bytes) if bytes.is_empty() => DecodeOutcome::DecodeFailed("empty image".to_string()),
        Ok(bytes) => DecodeOutcome::Decoded(bytes),
        Err(e) => DecodeOutcome::DecodeFailed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_base64() {
        assert_eq!(
            decode_image("aGVsbG8="),
            DecodeOutcome::Decoded(b"hello".to_vec())
        );
    }

    #[test]
    fn decodes_data_url() {
        assert_eq!(
            decode_image("data:image/jpeg;base64,aGVsbG8="),
            DecodeOutcome::Decoded(b"hello".to_vec())
        );
    }

    #[test]
    fn invalid_base64_fails_without_panicking() {
        assert!(matches!(
            decode_image("!!not base64!!"),
            DecodeOutcome::DecodeFailed(_)
        ));
    }

    #[test]
    fn empty_payload_fails() {
        assert!(matches!(decode_image(""), DecodeOutcome::DecodeFailed(_)));
    }

    #[test]
    fn frame_reports_length() {
        let frame = ImageFrame::new(1, vec![1u8, 2, 3]);
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_empty());
    }
}
