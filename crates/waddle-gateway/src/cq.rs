// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CQ-code markup for outbound messages.
//!
//! The gateway's send API embeds rich content inline as `[CQ:kind,key=value]`
//! codes inside the message string. Plain text must escape the characters
//! that would open or close a code; values inside a code must additionally
//! escape the comma that separates parameters.

use base64::Engine as _;

use waddle_core::AttachmentSource;

/// Escapes plain text so it cannot be parsed as CQ markup.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('[', "&#91;")
        .replace(']', "&#93;")
}

/// Escapes a parameter value inside a CQ code.
pub fn escape_param(value: &str) -> String {
    escape_text(value).replace(',', "&#44;")
}

/// A mention code for the given user id, or for everyone with `"all"`.
pub fn at(qq: &str) -> String {
    format!("[CQ:at,qq={}]", escape_param(qq))
}

/// An inline picture code.
pub fn image(reference: &str) -> String {
    format!("[CQ:image,file={}]", escape_param(reference))
}

/// An inline voice recording code.
pub fn record(reference: &str) -> String {
    format!("[CQ:record,file={}]", escape_param(reference))
}

/// Renders an attachment source as a `file` reference the gateway accepts:
/// a `file://` URI for local paths, the URL itself for remote content, or
/// a `base64://` blob for in-memory bytes.
pub fn attachment_reference(source: &AttachmentSource) -> String {
    match source {
        AttachmentSource::Path(path) => format!("file://{}", path.display()),
        AttachmentSource::Url(url) => url.clone(),
        AttachmentSource::Bytes(bytes) => format!(
            "base64://{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        ),
    }
}

/// Shortens quoted text for a reply header.
///
/// Counts characters, not bytes; quoted CJK text truncates at the same
/// visible width as ASCII. Text at or over the limit is cut and suffixed
/// with a single ellipsis.
pub fn truncate_quote(text: &str, max_chars: usize) -> String {
    if text.chars().count() >= max_chars {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push('…');
        cut
    } else {
        text.to_string()
    }
}
