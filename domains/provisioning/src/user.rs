//! User resource adapter
//!
//! Direct one-call wrappers with no reconciliation branching: add an
//! existing user id to a flow, read the user back by id, remove it from
//! the organization, and resolve a member by email for the host's
//! directory lookups.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use flowline_api::FlowlineService;

use crate::{ProvisionError, Result};

/// Desired state for a flow membership, as supplied by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSpec {
    pub org: String,
    pub flow: String,
    pub user_id: i64,
}

impl UserSpec {
    /// Validate host-supplied fields before any remote call is made.
    pub fn validate(&self) -> Result<()> {
        if self.org.trim().is_empty() {
            return Err(ProvisionError::Validation(
                "org must not be empty".to_string(),
            ));
        }
        if self.flow.trim().is_empty() {
            return Err(ProvisionError::Validation(
                "flow must not be empty".to_string(),
            ));
        }
        if self.user_id <= 0 {
            return Err(ProvisionError::Validation(format!(
                "user_id {} is not a valid server-assigned id",
                self.user_id
            )));
        }
        Ok(())
    }
}

/// Resolved observable state for a managed flow membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub org: String,
    pub flow: String,
    pub email: String,
    pub name: String,
    pub nick: String,
}

/// Manages flow memberships for existing organization users.
pub struct UserProvisioner {
    api: Arc<dyn FlowlineService>,
}

impl UserProvisioner {
    /// Create a provisioner over the given Flowline service.
    pub fn new(api: Arc<dyn FlowlineService>) -> Self {
        Self { api }
    }

    /// Add the user to the flow, then read the resolved state back.
    pub async fn create(&self, spec: &UserSpec) -> Result<UserRecord> {
        spec.validate()?;
        self.api
            .add_user_to_flow(&spec.org, &spec.flow, spec.user_id)
            .await?;
        self.read(&spec.org, &spec.flow, spec.user_id).await
    }

    /// Fetch the user by id and populate the observable fields.
    pub async fn read(&self, org: &str, flow: &str, user_id: i64) -> Result<UserRecord> {
        let user = self.api.get_user_by_id(user_id).await?;
        Ok(UserRecord {
            id: user.id,
            org: org.to_string(),
            flow: flow.to_string(),
            email: user.email,
            name: user.name,
            nick: user.nick,
        })
    }

    /// Update degrades to read: memberships carry no mutable fields.
    pub async fn update(&self, org: &str, flow: &str, user_id: i64) -> Result<UserRecord> {
        self.read(org, flow, user_id).await
    }

    /// Remove the user from the organization.
    pub async fn delete(&self, org: &str, user_id: i64) -> Result<()> {
        self.api.delete_user_from_org(org, user_id).await?;
        Ok(())
    }

    /// Resolve an organization member by exact email match.
    pub async fn find_by_email(&self, org: &str, email: &str) -> Result<UserRecord> {
        let user_id = self.api.get_user_id_by_email(org, email).await?;
        let id = user_id.parse::<i64>().map_err(|_| {
            ProvisionError::Identity(format!(
                "directory returned a non-numeric user id {:?}",
                user_id
            ))
        })?;
        self.read(org, "", id).await
    }
}
