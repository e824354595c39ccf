//! Ownership and permission resolution for event mutations.
//!
//! Events booked through the chat pipeline carry an attribution tag in the
//! provider's private extended properties. A mutation is allowed when the
//! requester is the attributed owner, or when they hold an owner/admin role
//! on the agent. Events with no tag (created outside the bot, or before
//! tagging existed) are allowed with a warning rather than bricking them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use calbroker_core::{BookedEvent, ChannelIdentity};
use calbroker_providers::BoxFuture;

use crate::error::{EngineError, EngineResult};
use crate::integration::StoreError;

/// A user's role on an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Full control, including other users' bookings.
    Owner,
    /// Same mutation rights as owner.
    Admin,
    /// May only manage their own bookings.
    Member,
}

impl AgentRole {
    /// Returns `true` if this role may mutate other users' bookings.
    pub fn can_manage_others(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

/// Lookup of a user's role on an agent.
///
/// Backed by whatever membership store the deployment uses; tests use
/// [`StaticRoleStore`].
pub trait RoleStore: Send + Sync {
    /// Returns the user's role on the agent, or `None` for non-members.
    fn role(
        &self,
        agent_id: String,
        user_id: ChannelIdentity,
    ) -> BoxFuture<'_, Result<Option<AgentRole>, StoreError>>;
}

/// A fixed in-memory [`RoleStore`].
#[derive(Debug, Default)]
pub struct StaticRoleStore {
    grants: std::collections::HashMap<(String, String), AgentRole>,
}

impl StaticRoleStore {
    /// Creates a store with no grants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants a role. The identity is normalized before storage.
    #[must_use]
    pub fn grant(mut self, agent_id: impl Into<String>, user: &str, role: AgentRole) -> Self {
        let identity = ChannelIdentity::normalize(user);
        self.grants
            .insert((agent_id.into(), identity.as_str().to_string()), role);
        self
    }
}

impl RoleStore for StaticRoleStore {
    fn role(
        &self,
        agent_id: String,
        user_id: ChannelIdentity,
    ) -> BoxFuture<'_, Result<Option<AgentRole>, StoreError>> {
        let role = self
            .grants
            .get(&(agent_id, user_id.as_str().to_string()))
            .copied();
        Box::pin(async move { Ok(role) })
    }
}

/// Decides whether a requester may mutate an event.
pub struct PermissionResolver {
    roles: Arc<dyn RoleStore>,
}

impl PermissionResolver {
    /// Creates a resolver over the given role store.
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self { roles }
    }

    /// Authorizes a mutation of `event` by `requester` on `agent_id`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the event belongs to another user and
    /// the requester's role does not allow managing others' bookings. The
    /// denial message distinguishes the two cases.
    pub async fn authorize(
        &self,
        event: &BookedEvent,
        requester: &ChannelIdentity,
        agent_id: &str,
    ) -> EngineResult<()> {
        let Some(ref attribution) = event.attribution else {
            // Legacy or externally created event: nothing to compare against.
            warn!(
                "event {} carries no attribution tag; allowing mutation by {}",
                event.id,
                requester.as_str()
            );
            return Ok(());
        };

        if attribution.user_id == *requester {
            debug!("event {} is owned by requester", event.id);
            return Ok(());
        }

        match self
            .roles
            .role(agent_id.to_string(), requester.clone())
            .await?
        {
            Some(role) if role.can_manage_others() => {
                debug!(
                    "event {} mutation allowed for {} via agent role",
                    event.id,
                    requester.as_str()
                );
                Ok(())
            }
            Some(_) => Err(EngineError::PermissionDenied(
                "your role on this agent does not allow managing other users' appointments"
                    .to_string(),
            )),
            None => Err(EngineError::PermissionDenied(
                "this appointment belongs to another user".to_string(),
            )),
        }
    }
}
