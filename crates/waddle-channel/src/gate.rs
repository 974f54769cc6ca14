// SPDX-FileCopyrightText: 2026 Waddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection-state gate in front of the gateway client.
//!
//! Every pipeline component calls the gateway through this wrapper. While the
//! health monitor has not observed a fully online gateway, calls fail fast
//! with [`WaddleError::GatewayOffline`] instead of timing out against a dead
//! endpoint, and the operator gets a throttled alert. The monitor itself
//! probes the inner client directly.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use waddle_core::error::WaddleError;
use waddle_core::message::GroupRequestKind;
use waddle_core::state::ConnectionState;
use waddle_gateway::Gateway;
use waddle_gateway::types::{
    ForwardNode, FriendEntry, GroupEntry, GroupMemberEntry, LoginInfo, MessageTarget,
    StatusPayload, StrangerEntry,
};

use crate::delivery::{Alerter, AlertThrottle};

pub struct GatedGateway {
    inner: Arc<dyn Gateway>,
    state: watch::Receiver<ConnectionState>,
    alerter: Alerter,
    /// Shared with the health monitor; a recovered gateway reopens it.
    throttle: Arc<AlertThrottle>,
}

impl GatedGateway {
    pub fn new(
        inner: Arc<dyn Gateway>,
        state: watch::Receiver<ConnectionState>,
        alerter: Alerter,
        throttle: Arc<AlertThrottle>,
    ) -> Self {
        Self {
            inner,
            state,
            alerter,
            throttle,
        }
    }

    async fn ensure_online(&self) -> Result<(), WaddleError> {
        if self.state.borrow().is_online() {
            return Ok(());
        }
        metrics::counter!("waddle_gateway_gated_total").increment(1);
        if self.throttle.fire() {
            self.alerter
                .alert(
                    "Your account is offline.\n\
                     Messages cannot reach the gateway until the connection recovers.",
                )
                .await;
        }
        Err(WaddleError::GatewayOffline)
    }
}

#[async_trait]
impl Gateway for GatedGateway {
    async fn get_status(&self) -> Result<StatusPayload, WaddleError> {
        self.ensure_online().await?;
        self.inner.get_status().await
    }

    async fn get_login_info(&self) -> Result<LoginInfo, WaddleError> {
        self.ensure_online().await?;
        self.inner.get_login_info().await
    }

    async fn get_stranger_info(
        &self,
        user_id: i64,
        no_cache: bool,
    ) -> Result<StrangerEntry, WaddleError> {
        self.ensure_online().await?;
        self.inner.get_stranger_info(user_id, no_cache).await
    }

    async fn get_friend_list(&self) -> Result<Vec<FriendEntry>, WaddleError> {
        self.ensure_online().await?;
        self.inner.get_friend_list().await
    }

    async fn get_group_list(&self) -> Result<Vec<GroupEntry>, WaddleError> {
        self.ensure_online().await?;
        self.inner.get_group_list().await
    }

    async fn get_group_info(
        &self,
        group_id: i64,
        no_cache: bool,
    ) -> Result<GroupEntry, WaddleError> {
        self.ensure_online().await?;
        self.inner.get_group_info(group_id, no_cache).await
    }

    async fn get_group_member_list(
        &self,
        group_id: i64,
    ) -> Result<Vec<GroupMemberEntry>, WaddleError> {
        self.ensure_online().await?;
        self.inner.get_group_member_list(group_id).await
    }

    async fn get_group_file_url(
        &self,
        group_id: i64,
        file_id: &str,
        bus_id: i64,
    ) -> Result<String, WaddleError> {
        self.ensure_online().await?;
        self.inner.get_group_file_url(group_id, file_id, bus_id).await
    }

    async fn get_forward_msg(&self, forward_id: &str) -> Result<Vec<ForwardNode>, WaddleError> {
        self.ensure_online().await?;
        self.inner.get_forward_msg(forward_id).await
    }

    async fn send_msg(&self, target: MessageTarget, message: &str) -> Result<i64, WaddleError> {
        self.ensure_online().await?;
        self.inner.send_msg(target, message).await
    }

    async fn delete_msg(&self, message_id: i64) -> Result<(), WaddleError> {
        self.ensure_online().await?;
        self.inner.delete_msg(message_id).await
    }

    async fn set_group_kick(&self, group_id: i64, user_id: i64) -> Result<(), WaddleError> {
        self.ensure_online().await?;
        self.inner.set_group_kick(group_id, user_id).await
    }

    async fn set_friend_add_request(&self, flag: &str, approve: bool) -> Result<(), WaddleError> {
        self.ensure_online().await?;
        self.inner.set_friend_add_request(flag, approve).await
    }

    async fn set_group_add_request(
        &self,
        flag: &str,
        kind: GroupRequestKind,
        approve: bool,
    ) -> Result<(), WaddleError> {
        self.ensure_online().await?;
        self.inner.set_group_add_request(flag, kind, approve).await
    }
}
