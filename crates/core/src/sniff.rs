//! Content-based MIME detection for file uploads.
//!
//! Binary formats are recognized by magic bytes via `infer`; payloads that
//! decode as UTF-8 fall through to a small text heuristic (XML, JSON, plain
//! text). Used by the file side-channel when the caller did not set a MIME
//! type explicitly.

/// Fallback for payloads that are neither a known binary format nor UTF-8.
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Detect the MIME type of `data` by inspecting its content.
///
/// Never returns an empty string.
pub fn detect_mime(data: &[u8]) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }

    match std::str::from_utf8(data) {
        Ok(text) => detect_text_mime(text).to_string(),
        Err(_) => MIME_OCTET_STREAM.to_string(),
    }
}

fn detect_text_mime(text: &str) -> &'static str {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with("<?xml") {
        return "text/xml";
    }
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde::de::IgnoredAny>(trimmed).is_ok()
    {
        return "application/json";
    }
    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        return "text/html";
    }
    "text/plain"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_xml_declaration() {
        let data = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><doc/>";
        assert_eq!(detect_mime(data), "text/xml");
    }

    #[test]
    fn detects_json_object() {
        assert_eq!(detect_mime(b"{\"a\": 1}"), "application/json");
        assert_eq!(detect_mime(b"[1, 2, 3]"), "application/json");
    }

    #[test]
    fn invalid_json_is_plain_text() {
        assert_eq!(detect_mime(b"{not json"), "text/plain");
    }

    #[test]
    fn detects_png_magic_bytes() {
        let data = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0];
        assert_eq!(detect_mime(&data), "image/png");
    }

    #[test]
    fn arbitrary_bytes_fall_back_to_octet_stream() {
        assert_eq!(detect_mime(&[0xff, 0xfe, 0x00, 0x01]), MIME_OCTET_STREAM);
    }

    #[test]
    fn plain_text_is_never_empty() {
        assert_eq!(detect_mime(b"hello there"), "text/plain");
        assert!(!detect_mime(b"").is_empty());
    }
}
