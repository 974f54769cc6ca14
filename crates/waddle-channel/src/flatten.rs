// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flattens gateway message segments into framework-ready text.
//!
//! Text-like segments (text, faces, mentions, quotes, forwards) concatenate
//! into one string, recording mention spans in final-text character offsets
//! as they land. Media segments become extra payloads delivered as separate
//! messages. Merged forwards are fetched and inlined recursively, capped at a
//! fixed nesting depth.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::warn;

use waddle_core::identity::MemberIdentity;
use waddle_core::message::{AttachmentRef, MentionSpan, PayloadKind};
use waddle_gateway::segment::{RawSegment, Segment};
use waddle_gateway::Gateway;

use crate::cache::CacheStore;
use crate::delivery::Alerter;
use crate::emoji::{face_to_emoji, UNKNOWN_FACE};

/// Divider line used inside quote and forward renderings.
const DIVIDER: &str = "- - - - - - - - - - - - - - -";

/// Forwards nested deeper than this render as a placeholder instead of being
/// fetched.
const MAX_FORWARD_DEPTH: usize = 8;

const FORWARD_DEPTH_PLACEHOLDER: &str = "[forward depth limit reached]";
const FORWARD_UNAVAILABLE_PLACEHOLDER: &str = "[forwarded messages unavailable]";

/// Where the segments came from, as far as name resolution is concerned.
#[derive(Debug, Clone, Default)]
pub struct FlattenScope {
    /// Group the message arrived in; mention names prefer the group card.
    pub group_id: Option<i64>,
    /// The bot's own member identity; mention spans are only recorded when
    /// this is known.
    pub self_member: Option<MemberIdentity>,
}

/// A non-text payload split out of the flattened event.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraPayload {
    pub kind: PayloadKind,
    pub text: String,
    pub attachment: Option<AttachmentRef>,
}

/// The result of flattening one event's segment list.
#[derive(Debug, Clone, Default)]
pub struct FlattenedEvent {
    pub text: String,
    /// Spans covering mentions of the bot (or of everyone), in final-text
    /// character offsets.
    pub spans: Vec<MentionSpan>,
    /// Media and placeholder payloads, in segment order.
    pub extras: Vec<ExtraPayload>,
}

#[derive(Clone)]
pub struct SegmentFlattener {
    cache: Arc<CacheStore>,
    gateway: Arc<dyn Gateway>,
    alerter: Alerter,
}

impl SegmentFlattener {
    pub fn new(cache: Arc<CacheStore>, gateway: Arc<dyn Gateway>, alerter: Alerter) -> Self {
        Self {
            cache,
            gateway,
            alerter,
        }
    }

    /// Flattens a raw segment list. Lookup failures degrade to whatever name
    /// or placeholder is available; this never fails the whole event.
    pub async fn flatten(&self, scope: &FlattenScope, raw: &[RawSegment]) -> FlattenedEvent {
        let mut out = FlattenedEvent::default();
        let segments = Segment::decode_all(raw);
        self.flatten_segments(scope, &segments, 0, true, &mut out)
            .await;
        out
    }

    /// Boxed for recursion: forward nodes may themselves contain forwards.
    fn flatten_segments<'a>(
        &'a self,
        scope: &'a FlattenScope,
        segments: &'a [Segment],
        depth: usize,
        record_spans: bool,
        out: &'a mut FlattenedEvent,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            for segment in segments {
                match segment {
                    Segment::Text { text } => out.text.push_str(text),
                    Segment::Face { id } => {
                        let emoji = id
                            .parse::<u32>()
                            .map(face_to_emoji)
                            .unwrap_or(UNKNOWN_FACE);
                        out.text.push_str(emoji);
                    }
                    Segment::Sface => out.text.push_str(UNKNOWN_FACE),
                    Segment::At { qq } => self.flatten_mention(scope, qq, record_spans, out).await,
                    Segment::Reply { qq, text } => {
                        let (remark, nickname) = self.quoted_names(qq).await;
                        out.text
                            .push_str(&format!("「{remark}（{nickname}）：{text}」\n{DIVIDER}\n"));
                    }
                    Segment::Forward { id } => {
                        self.flatten_forward(scope, id, depth, out).await;
                    }
                    Segment::Image { file, url } => out.extras.push(ExtraPayload {
                        kind: PayloadKind::Image,
                        text: String::new(),
                        attachment: Some(AttachmentRef {
                            name: file.clone(),
                            url: url.clone(),
                            size: None,
                        }),
                    }),
                    Segment::Record { file, url } => out.extras.push(ExtraPayload {
                        kind: PayloadKind::Voice,
                        text: String::new(),
                        attachment: Some(AttachmentRef {
                            name: file.clone(),
                            url: url.clone(),
                            size: None,
                        }),
                    }),
                    Segment::Video { file, url } => out.extras.push(ExtraPayload {
                        kind: PayloadKind::Video,
                        text: String::new(),
                        attachment: Some(AttachmentRef {
                            name: file.clone(),
                            url: url.clone(),
                            size: None,
                        }),
                    }),
                    Segment::Share { url, title } => out.extras.push(ExtraPayload {
                        kind: PayloadKind::Share,
                        text: format!("{title}\n{url}"),
                        attachment: None,
                    }),
                    Segment::Location { content } => out.extras.push(ExtraPayload {
                        kind: PayloadKind::Location,
                        text: content.clone(),
                        attachment: None,
                    }),
                    Segment::Unsupported { kind } => out.extras.push(ExtraPayload {
                        kind: PayloadKind::Unsupported,
                        text: format!("Unsupported message type: {kind}"),
                        attachment: None,
                    }),
                }
            }
        })
    }

    /// Renders one mention as `@{name} ` and records a span when it points
    /// at the bot or at everyone. The span covers the whole inserted text,
    /// trailing space included.
    async fn flatten_mention(
        &self,
        scope: &FlattenScope,
        qq: &str,
        record_spans: bool,
        out: &mut FlattenedEvent,
    ) {
        let name = if qq == "all" {
            "all".to_string()
        } else {
            match qq.parse::<i64>() {
                Ok(user_id) => self.mention_name(scope, user_id).await,
                Err(_) => qq.to_string(),
            }
        };
        let inserted = format!("@{name} ");
        if record_spans {
            if let Some(self_member) = &scope.self_member {
                if qq == "all" || qq == self_member.uid.as_str() {
                    let start = out.text.chars().count();
                    out.spans.push(MentionSpan {
                        start,
                        end: start + inserted.chars().count(),
                        target: self_member.clone(),
                    });
                }
            }
        }
        out.text.push_str(&inserted);
    }

    /// Display name for a mentioned user: their group card when set, else
    /// nickname, else the bare id when nothing resolves.
    async fn mention_name(&self, scope: &FlattenScope, user_id: i64) -> String {
        if let Some(group_id) = scope.group_id {
            if let Some(member) = self
                .cache
                .find_member(self.gateway.as_ref(), &self.alerter, group_id, user_id)
                .await
            {
                return if member.card.is_empty() {
                    member.nickname
                } else {
                    member.card
                };
            }
        }
        match self
            .cache
            .user_profile(self.gateway.as_ref(), user_id, false)
            .await
        {
            Ok(profile) => profile.nickname,
            Err(err) => {
                warn!(user_id, error = %err, "mention name lookup failed");
                user_id.to_string()
            }
        }
    }

    async fn quoted_names(&self, qq: &str) -> (String, String) {
        if let Ok(user_id) = qq.parse::<i64>() {
            if let Ok(profile) = self
                .cache
                .user_profile(self.gateway.as_ref(), user_id, false)
                .await
            {
                return (profile.remark, profile.nickname);
            }
        }
        (qq.to_string(), qq.to_string())
    }

    /// Fetches a merged forward and inlines every node between banner lines.
    /// Mention spans inside forwarded content are not recorded; media inside
    /// forwarded content still splits out as extras.
    async fn flatten_forward(
        &self,
        scope: &FlattenScope,
        forward_id: &str,
        depth: usize,
        out: &mut FlattenedEvent,
    ) {
        if depth >= MAX_FORWARD_DEPTH {
            warn!(forward_id, depth, "forward nesting depth cap hit");
            out.text.push_str(FORWARD_DEPTH_PLACEHOLDER);
            return;
        }
        let nodes = match self.gateway.get_forward_msg(forward_id).await {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!(forward_id, error = %err, "forward fetch failed");
                out.text.push_str(FORWARD_UNAVAILABLE_PLACEHOLDER);
                return;
            }
        };
        out.text.push_str(&format!("合并转发消息开始\n{DIVIDER}\n"));
        for node in &nodes {
            let (remark, nickname) = match self
                .cache
                .user_profile(self.gateway.as_ref(), node.sender.user_id, false)
                .await
            {
                Ok(profile) => (profile.remark, profile.nickname),
                Err(_) => (node.sender.nickname.clone(), node.sender.nickname.clone()),
            };
            out.text.push_str(&format!("{remark}（{nickname}）：\n"));
            let node_segments = Segment::decode_all(&node.content);
            self.flatten_segments(scope, &node_segments, depth + 1, false, out)
                .await;
            out.text.push_str(&format!("\n{DIVIDER}\n"));
        }
        out.text.push_str("合并转发消息结束");
    }
}
