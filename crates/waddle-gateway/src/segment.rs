// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message segment decoding.
//!
//! The gateway delivers message bodies as arrays of `{type, data}` pairs.
//! [`Segment::from_raw`] decodes each pair into a closed enum so the
//! flattener dispatches exhaustively; anything it does not recognize
//! becomes [`Segment::Unsupported`] instead of an error.

use serde::Deserialize;
use serde_json::Value;

/// A segment as it appears on the wire: a type tag plus a loose data map.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSegment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// A decoded message segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Plain text.
    Text { text: String },
    /// Built-in QQ face, identified by a numeric id.
    Face { id: String },
    /// Super face (big animated sticker); carries no usable payload.
    Sface,
    /// Mention of a user, or of everyone when `qq` is `"all"`.
    At { qq: String },
    /// Reply to an earlier message. The gateway inlines the quoted
    /// author and text so no extra fetch is needed.
    Reply { qq: String, text: String },
    /// A merged-forward bundle, resolved through `get_forward_msg`.
    Forward { id: String },
    /// Picture attachment.
    Image { file: String, url: Option<String> },
    /// Voice attachment.
    Record { file: String, url: Option<String> },
    /// Video attachment.
    Video { file: String, url: Option<String> },
    /// Link share card.
    Share { url: String, title: String },
    /// Location card.
    Location { content: String },
    /// Anything the pipeline has no handling for.
    Unsupported { kind: String },
}

impl Segment {
    /// Decodes one wire segment.
    ///
    /// Missing required fields degrade to [`Segment::Unsupported`] so a
    /// malformed segment never poisons the rest of the message.
    pub fn from_raw(raw: &RawSegment) -> Segment {
        let data = &raw.data;
        match raw.kind.as_str() {
            "text" => match str_field(data, "text") {
                Some(text) => Segment::Text { text },
                None => unsupported(&raw.kind),
            },
            "face" => match str_field(data, "id") {
                Some(id) => Segment::Face { id },
                None => unsupported(&raw.kind),
            },
            "sface" => Segment::Sface,
            "at" => match str_field(data, "qq") {
                Some(qq) => Segment::At { qq },
                None => unsupported(&raw.kind),
            },
            "reply" => match str_field(data, "qq") {
                Some(qq) => Segment::Reply {
                    qq,
                    text: str_field(data, "text").unwrap_or_default(),
                },
                None => unsupported(&raw.kind),
            },
            "forward" => match str_field(data, "id") {
                Some(id) => Segment::Forward { id },
                None => unsupported(&raw.kind),
            },
            "image" => match str_field(data, "file") {
                Some(file) => Segment::Image {
                    file,
                    url: str_field(data, "url"),
                },
                None => unsupported(&raw.kind),
            },
            "record" => match str_field(data, "file") {
                Some(file) => Segment::Record {
                    file,
                    url: str_field(data, "url"),
                },
                None => unsupported(&raw.kind),
            },
            "video" => match str_field(data, "file") {
                Some(file) => Segment::Video {
                    file,
                    url: str_field(data, "url"),
                },
                None => unsupported(&raw.kind),
            },
            "share" => match str_field(data, "url") {
                Some(url) => Segment::Share {
                    url,
                    title: str_field(data, "title").unwrap_or_default(),
                },
                None => unsupported(&raw.kind),
            },
            "location" => Segment::Location {
                content: str_field(data, "content")
                    .or_else(|| str_field(data, "title"))
                    .unwrap_or_default(),
            },
            other => unsupported(other),
        }
    }

    /// Decodes a whole wire message body.
    pub fn decode_all(raw: &[RawSegment]) -> Vec<Segment> {
        raw.iter().map(Segment::from_raw).collect()
    }
}

fn unsupported(kind: &str) -> Segment {
    Segment::Unsupported {
        kind: kind.to_string(),
    }
}

/// Reads a data field as a string, accepting the numeric spellings some
/// gateway builds emit for ids.
fn str_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawSegment {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn decodes_text_segment() {
        let seg = Segment::from_raw(&raw(json!({"type": "text", "data": {"text": "hello"}})));
        assert_eq!(
            seg,
            Segment::Text {
                text: "hello".to_string()
            }
        );
    }

    #[test]
    fn decodes_at_with_numeric_qq() {
        let seg = Segment::from_raw(&raw(json!({"type": "at", "data": {"qq": 10086}})));
        assert_eq!(
            seg,
            Segment::At {
                qq: "10086".to_string()
            }
        );
    }

    #[test]
    fn decodes_at_all() {
        let seg = Segment::from_raw(&raw(json!({"type": "at", "data": {"qq": "all"}})));
        assert_eq!(
            seg,
            Segment::At {
                qq: "all".to_string()
            }
        );
    }

    #[test]
    fn decodes_reply_with_inline_quote() {
        let seg = Segment::from_raw(&raw(json!({
            "type": "reply",
            "data": {"qq": "111", "text": "original words"}
        })));
        assert_eq!(
            seg,
            Segment::Reply {
                qq: "111".to_string(),
                text: "original words".to_string()
            }
        );
    }

    #[test]
    fn decodes_image_with_optional_url() {
        let seg = Segment::from_raw(&raw(json!({
            "type": "image",
            "data": {"file": "abc.image", "url": "http://example.com/abc.jpg"}
        })));
        assert_eq!(
            seg,
            Segment::Image {
                file: "abc.image".to_string(),
                url: Some("http://example.com/abc.jpg".to_string())
            }
        );
    }

    #[test]
    fn unknown_type_becomes_unsupported() {
        let seg = Segment::from_raw(&raw(json!({"type": "dice", "data": {"value": 3}})));
        assert_eq!(
            seg,
            Segment::Unsupported {
                kind: "dice".to_string()
            }
        );
    }

    #[test]
    fn missing_required_field_becomes_unsupported() {
        let seg = Segment::from_raw(&raw(json!({"type": "text", "data": {}})));
        assert_eq!(
            seg,
            Segment::Unsupported {
                kind: "text".to_string()
            }
        );
    }

    #[test]
    fn sface_carries_no_payload() {
        let seg = Segment::from_raw(&raw(json!({"type": "sface", "data": {"id": 853}})));
        assert_eq!(seg, Segment::Sface);
    }

    #[test]
    fn decode_all_preserves_order() {
        let raws: Vec<RawSegment> = serde_json::from_value(json!([
            {"type": "text", "data": {"text": "a"}},
            {"type": "face", "data": {"id": "14"}},
            {"type": "text", "data": {"text": "b"}}
        ]))
        .unwrap();
        let segs = Segment::decode_all(&raws);
        assert_eq!(segs.len(), 3);
        assert!(matches!(segs[1], Segment::Face { .. }));
    }

    #[test]
    fn segment_without_data_field_decodes() {
        let seg = Segment::from_raw(&raw(json!({"type": "text"})));
        assert_eq!(
            seg,
            Segment::Unsupported {
                kind: "text".to_string()
            }
        );
    }
}
