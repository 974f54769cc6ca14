// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the QQ gateway API.
//!
//! Provides [`HttpGateway`], which posts one JSON body per action to
//! `<api_root>/<action>` and maps failures onto the two error classes the
//! pipeline distinguishes: the gateway being unreachable versus the
//! gateway answering with a failure envelope.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use waddle_core::{GroupRequestKind, WaddleError};

use crate::api::Gateway;
use crate::types::{
    ApiResponse, FileUrl, ForwardBundle, ForwardNode, FriendEntry, GroupEntry, GroupMemberEntry,
    LoginInfo, MessageTarget, SentMessage, StatusPayload, StrangerEntry,
};

/// HTTP client for gateway communication.
///
/// One instance is shared across the whole channel; reqwest pools
/// connections internally.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    api_root: String,
}

impl HttpGateway {
    /// Creates a gateway client for the given API root.
    ///
    /// When `access_token` is set, every request carries it as a bearer
    /// `Authorization` header.
    pub fn new(
        api_root: &str,
        access_token: Option<&str>,
        request_timeout: Duration,
    ) -> Result<Self, WaddleError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(token) = access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| WaddleError::Config(format!("invalid access token: {e}")))?;
            headers.insert("authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(|e| WaddleError::TransportUnreachable {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
        })
    }

    /// Overrides the API root (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.api_root = url.trim_end_matches('/').to_string();
        self
    }

    /// Posts one action and decodes its data payload.
    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Map<String, Value>,
    ) -> Result<T, WaddleError> {
        let envelope = self.post_action::<T>(action, params).await?;
        envelope.data.ok_or_else(|| WaddleError::ApiFailure {
            message: format!("gateway returned no data for {action}"),
            status: 200,
            retcode: envelope.retcode,
        })
    }

    /// Posts one action, accepting an empty data payload.
    async fn call_unit(&self, action: &str, params: Map<String, Value>) -> Result<(), WaddleError> {
        self.post_action::<Value>(action, params).await.map(|_| ())
    }

    async fn post_action<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Map<String, Value>,
    ) -> Result<ApiResponse<T>, WaddleError> {
        let url = format!("{}/{action}", self.api_root);
        metrics::counter!("waddle_gateway_calls_total", "action" => action.to_string())
            .increment(1);

        let response = self
            .client
            .post(&url)
            .json(&Value::Object(params))
            .send()
            .await
            .map_err(|e| WaddleError::TransportUnreachable {
                message: format!("gateway request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(action, status = %status, "gateway response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WaddleError::ApiFailure {
                message: format!("gateway returned non-success body for {action}: {body}"),
                status: status.as_u16(),
                retcode: -1,
            });
        }

        let envelope: ApiResponse<T> =
            response
                .json()
                .await
                .map_err(|e| WaddleError::TransportUnreachable {
                    message: format!("failed to decode gateway response for {action}: {e}"),
                    source: Some(Box::new(e)),
                })?;

        if envelope.status == "failed" || envelope.retcode != 0 {
            metrics::counter!("waddle_gateway_failures_total", "action" => action.to_string())
                .increment(1);
            return Err(WaddleError::ApiFailure {
                message: format!("gateway rejected {action}"),
                status: status.as_u16(),
                retcode: envelope.retcode,
            });
        }

        Ok(envelope)
    }
}

fn params(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[async_trait::async_trait]
impl Gateway for HttpGateway {
    async fn get_status(&self) -> Result<StatusPayload, WaddleError> {
        self.call("get_status", Map::new()).await
    }

    async fn get_login_info(&self) -> Result<LoginInfo, WaddleError> {
        self.call("get_login_info", Map::new()).await
    }

    async fn get_stranger_info(
        &self,
        user_id: i64,
        no_cache: bool,
    ) -> Result<StrangerEntry, WaddleError> {
        self.call(
            "get_stranger_info",
            params(&[("user_id", user_id.into()), ("no_cache", no_cache.into())]),
        )
        .await
    }

    async fn get_friend_list(&self) -> Result<Vec<FriendEntry>, WaddleError> {
        self.call("get_friend_list", Map::new()).await
    }

    async fn get_group_list(&self) -> Result<Vec<GroupEntry>, WaddleError> {
        self.call("get_group_list", Map::new()).await
    }

    async fn get_group_info(
        &self,
        group_id: i64,
        no_cache: bool,
    ) -> Result<GroupEntry, WaddleError> {
        self.call(
            "get_group_info",
            params(&[("group_id", group_id.into()), ("no_cache", no_cache.into())]),
        )
        .await
    }

    async fn get_group_member_list(
        &self,
        group_id: i64,
    ) -> Result<Vec<GroupMemberEntry>, WaddleError> {
        self.call(
            "get_group_member_list",
            params(&[("group_id", group_id.into())]),
        )
        .await
    }

    async fn get_group_file_url(
        &self,
        group_id: i64,
        file_id: &str,
        bus_id: i64,
    ) -> Result<String, WaddleError> {
        let payload: FileUrl = self
            .call(
                "get_group_file_url",
                params(&[
                    ("group_id", group_id.into()),
                    ("file_id", file_id.into()),
                    ("busid", bus_id.into()),
                ]),
            )
            .await?;
        Ok(payload.url)
    }

    async fn get_forward_msg(&self, forward_id: &str) -> Result<Vec<ForwardNode>, WaddleError> {
        let bundle: ForwardBundle = self
            .call("get_forward_msg", params(&[("message_id", forward_id.into())]))
            .await?;
        Ok(bundle.messages)
    }

    async fn send_msg(&self, target: MessageTarget, message: &str) -> Result<i64, WaddleError> {
        let mut body = Map::new();
        target.write_params(&mut body);
        body.insert("message".to_string(), Value::String(message.to_string()));
        let sent: SentMessage = self.call("send_msg", body).await?;
        Ok(sent.message_id)
    }

    async fn delete_msg(&self, message_id: i64) -> Result<(), WaddleError> {
        self.call_unit("delete_msg", params(&[("message_id", message_id.into())]))
            .await
    }

    async fn set_group_kick(&self, group_id: i64, user_id: i64) -> Result<(), WaddleError> {
        self.call_unit(
            "set_group_kick",
            params(&[("group_id", group_id.into()), ("user_id", user_id.into())]),
        )
        .await
    }

    async fn set_friend_add_request(&self, flag: &str, approve: bool) -> Result<(), WaddleError> {
        self.call_unit(
            "set_friend_add_request",
            params(&[("flag", flag.into()), ("approve", approve.into())]),
        )
        .await
    }

    async fn set_group_add_request(
        &self,
        flag: &str,
        kind: GroupRequestKind,
        approve: bool,
    ) -> Result<(), WaddleError> {
        self.call_unit(
            "set_group_add_request",
            params(&[
                ("flag", flag.into()),
                ("sub_type", kind.to_string().into()),
                ("approve", approve.into()),
            ]),
        )
        .await
    }
}
