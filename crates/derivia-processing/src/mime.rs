//! MIME classification of origin images
//!
//! Decides whether an origin is refused, returned untouched, or decoded and
//! transformed. When the store has no content type the bytes are sniffed.

use crate::image::encode::detect_format;
use derivia_core::{Config, DerivativeError};
use image::ImageFormat;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Stored types that say nothing about the bytes; S3 defaults to the first.
const GENERIC_TYPES: [&str; 2] = ["binary/octet-stream", OCTET_STREAM];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeClass {
    /// Decodable by the transform engine; re-encoded in this format
    Transformable(ImageFormat),
    /// Returned byte-identical to the origin
    PassThrough,
}

#[derive(Debug, Clone)]
pub struct MimePolicy {
    enforce: bool,
    allowed: Vec<String>,
    passthrough: Vec<String>,
}

impl MimePolicy {
    pub fn new(config: &Config) -> Self {
        Self {
            enforce: config.enforce_mime_types(),
            allowed: config.allowed_content_types().to_vec(),
            passthrough: config.passthrough_content_types().to_vec(),
        }
    }

    /// Content type to record for an origin: the stored one when it names a
    /// type, otherwise sniffed from the bytes.
    pub fn resolve_content_type(stored: Option<&str>, data: &[u8]) -> String {
        match stored
            .map(normalize)
            .filter(|ct| !ct.is_empty() && !GENERIC_TYPES.contains(&ct.as_str()))
        {
            Some(ct) => ct,
            None => sniff(data).to_string(),
        }
    }

    pub fn classify(&self, content_type: &str) -> Result<MimeClass, DerivativeError> {
        let content_type = normalize(content_type);

        if self.enforce && !self.allowed.iter().any(|a| *a == content_type) {
            return Err(DerivativeError::UnsupportedMimeType { content_type });
        }

        if self.passthrough.iter().any(|p| *p == content_type) {
            return Ok(MimeClass::PassThrough);
        }

        // Allowed but not decodable here: hand it back untouched.
        Ok(detect_format(&content_type)
            .map(MimeClass::Transformable)
            .unwrap_or(MimeClass::PassThrough))
    }
}

/// Lowercase, drop parameters and fold aliases
/// (`Image/JPG; q=1` -> `image/jpeg`)
fn normalize(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        "image/x-png" => "image/png".to_string(),
        "image/tif" => "image/tiff".to_string(),
        _ => essence,
    }
}

fn sniff(data: &[u8]) -> &'static str {
    if let Ok(format) = image::guess_format(data) {
        return format.to_mime_type();
    }
    let head = &data[..data.len().min(256)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start();
    if text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg")) {
        return "image/svg+xml";
    }
    OCTET_STREAM
}

#[cfg(test)]
mod tests {
    use super::*;
    use derivia_core::DerivativeConfig;

    fn policy(configure: impl FnOnce(&mut DerivativeConfig)) -> MimePolicy {
        let mut inner = DerivativeConfig::with_bucket("images");
        configure(&mut inner);
        MimePolicy::new(&Config(Box::new(inner)))
    }

    #[test]
    fn test_default_classes() {
        let policy = policy(|_| {});
        assert_eq!(
            policy.classify("image/jpeg").unwrap(),
            MimeClass::Transformable(ImageFormat::Jpeg)
        );
        assert_eq!(
            policy.classify("Image/PNG; charset=binary").unwrap(),
            MimeClass::Transformable(ImageFormat::Png)
        );
        assert_eq!(policy.classify("image/gif").unwrap(), MimeClass::PassThrough);
        assert_eq!(
            policy.classify("image/svg+xml").unwrap(),
            MimeClass::PassThrough
        );
    }

    #[test]
    fn test_unsupported_type_is_refused() {
        let err = policy(|_| {}).classify("application/pdf").unwrap_err();
        assert!(matches!(
            err,
            DerivativeError::UnsupportedMimeType { ref content_type } if content_type == "application/pdf"
        ));
    }

    #[test]
    fn test_gate_can_be_disabled() {
        let policy = policy(|c| c.enforce_mime_types = false);
        assert_eq!(
            policy.classify("application/pdf").unwrap(),
            MimeClass::PassThrough
        );
    }

    #[test]
    fn test_resolve_content_type_sniffs() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(MimePolicy::resolve_content_type(None, &png), "image/png");
        assert_eq!(
            MimePolicy::resolve_content_type(Some(""), b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            "image/svg+xml"
        );
        assert_eq!(
            MimePolicy::resolve_content_type(Some("IMAGE/JPEG"), &png),
            "image/jpeg"
        );
        assert_eq!(MimePolicy::resolve_content_type(None, b"hello"), OCTET_STREAM);
    }

    #[test]
    fn test_generic_stored_types_are_sniffed() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F', 0];
        for stored in ["binary/octet-stream", "application/octet-stream", "Application/Octet-Stream"] {
            assert_eq!(
                MimePolicy::resolve_content_type(Some(stored), &jpeg),
                "image/jpeg",
                "stored {}",
                stored
            );
        }
        assert_eq!(
            MimePolicy::resolve_content_type(Some("binary/octet-stream"), b"hello"),
            OCTET_STREAM
        );
    }

    #[test]
    fn test_aliases_pass_the_gate() {
        let policy = policy(|_| {});
        assert_eq!(
            MimePolicy::resolve_content_type(Some("image/jpg"), b""),
            "image/jpeg"
        );
        assert_eq!(
            policy.classify("image/jpg").unwrap(),
            MimeClass::Transformable(ImageFormat::Jpeg)
        );
        assert_eq!(
            policy.classify("image/pjpeg").unwrap(),
            MimeClass::Transformable(ImageFormat::Jpeg)
        );
    }
}
