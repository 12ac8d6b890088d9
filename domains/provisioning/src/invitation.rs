//! Invitation reconciliation
//!
//! A single reconciled entity tracks either an adopted organization member
//! or a pending invitation. Create resolves which of the two it is; delete
//! trusts the stored tag to pick the matching remote delete.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use flowline_api::{ApiError, FlowlineService};

use crate::content;
use crate::identity::{ImportKey, ManagedIdentity};
use crate::{ProvisionError, Result};

/// Desired state for a reconciled invitation, as supplied by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvitationSpec {
    pub org: String,
    pub flow: String,
    pub email: String,
    /// Free-text invitation message; wins over the structured fields below.
    pub message: Option<String>,
    pub username: Option<String>,
    pub manager: Option<String>,
    pub ticket_number: Option<String>,
}

impl InvitationSpec {
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
        if !self.email.validate_email() {
            return Err(ProvisionError::Validation(format!(
                "invalid email address {:?}",
                self.email
            )));
        }
        Ok(())
    }

    /// Compose the outgoing invitation message.
    ///
    /// A non-empty verbatim message wins; otherwise a complete structured
    /// triple renders the fixed template; otherwise the message stays empty.
    pub fn compose_message(&self) -> String {
        if let Some(message) = &self.message {
            if !message.is_empty() {
                return message.clone();
            }
        }
        match (&self.username, &self.manager, &self.ticket_number) {
            (Some(username), Some(manager), Some(ticket_number)) => {
                content::invitation_message(username, manager, ticket_number)
            }
            _ => String::new(),
        }
    }
}

/// Resolved observable state for a reconciled invitation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationRecord {
    pub id: ManagedIdentity,
    pub org: String,
    pub flow: String,
    pub email: String,
    pub message: String,
    pub username: Option<String>,
    pub manager: Option<String>,
    pub ticket_number: Option<String>,
}

/// Reconciles a single invitation entity against the remote service.
pub struct InvitationProvisioner {
    api: Arc<dyn FlowlineService>,
}

impl InvitationProvisioner {
    /// Create a provisioner over the given Flowline service.
    pub fn new(api: Arc<dyn FlowlineService>) -> Self {
        Self { api }
    }

    /// Create or adopt.
    ///
    /// When the email already names an organization member, the member is
    /// adopted by user id and no invitation is issued. A true directory
    /// miss issues a new invitation tracked by invitation id. Any other
    /// lookup failure aborts the reconciliation unchanged.
    pub async fn create(&self, spec: &InvitationSpec) -> Result<InvitationRecord> {
        spec.validate()?;
        let message = spec.compose_message();

        match self.api.get_user_id_by_email(&spec.org, &spec.email).await {
            Ok(user_id) => {
                let id = user_id.parse::<i64>().map_err(|_| {
                    ProvisionError::Identity(format!(
                        "directory returned a non-numeric user id {:?}",
                        user_id
                    ))
                })?;
                tracing::debug!(
                    org = %spec.org,
                    email = %spec.email,
                    user_id = id,
                    "Adopting existing organization member"
                );
                Ok(self.resolved(spec, ManagedIdentity::User(id), message))
            }
            Err(ApiError::NoMatch(_)) => {
                let invitation = self
                    .api
                    .invite_new_user(&spec.email, &message, &spec.org, &spec.flow)
                    .await?;
                tracing::debug!(
                    org = %spec.org,
                    flow = %spec.flow,
                    invite_id = invitation.id,
                    "Issued new invitation"
                );
                Ok(self.resolved(spec, ManagedIdentity::Invitation(invitation.id), message))
            }
            // Transport and decode failures abort: a real outage must not
            // be mistaken for a missing member.
            Err(err) => Err(err.into()),
        }
    }

    /// Read leaves a resolved record unchanged; the remote state is not
    /// re-fetched for invitations.
    pub async fn read(&self, record: &InvitationRecord) -> Result<InvitationRecord> {
        Ok(record.clone())
    }

    /// Update degrades to read: the remote API offers no in-place
    /// invitation mutation.
    pub async fn update(&self, record: &InvitationRecord) -> Result<InvitationRecord> {
        self.read(record).await
    }

    /// Resolve an externally supplied identifier into a record.
    ///
    /// Composite keys (`{user_id}_{flow}_{org}`) fetch the named user and
    /// populate the observable fields from it. A plain identifier is
    /// treated as already resolved and produces no remote call.
    pub async fn import(&self, external_id: &str) -> Result<InvitationRecord> {
        if !ImportKey::is_composite(external_id) {
            let id: ManagedIdentity = external_id.parse()?;
            return Ok(InvitationRecord {
                id,
                org: String::new(),
                flow: String::new(),
                email: String::new(),
                message: String::new(),
                username: None,
                manager: None,
                ticket_number: None,
            });
        }

        let key = ImportKey::parse(external_id)?;
        let user = self.api.get_user_by_id(key.user_id).await?;
        tracing::debug!(
            org = %key.org,
            flow = %key.flow,
            user_id = user.id,
            "Imported existing organization member"
        );
        Ok(InvitationRecord {
            // The key names a user id, so the stored tag says user; later
            // deletes trust this tag.
            id: ManagedIdentity::User(user.id),
            org: key.org,
            flow: key.flow,
            email: user.email,
            message: String::new(),
            username: Some(user.name),
            manager: None,
            ticket_number: None,
        })
    }

    /// Delete the tracked entity.
    ///
    /// The stored tag is authoritative: an adopted member is removed from
    /// the organization, a pending invitation is revoked. Failures
    /// propagate to the host.
    pub async fn delete(&self, record: &InvitationRecord) -> Result<()> {
        match record.id {
            ManagedIdentity::User(user_id) => {
                self.api.delete_user_from_org(&record.org, user_id).await?;
            }
            ManagedIdentity::Invitation(invite_id) => {
                self.api
                    .delete_invitation_by_id(&record.org, &record.flow, invite_id)
                    .await?;
            }
        }
        Ok(())
    }

    fn resolved(
        &self,
        spec: &InvitationSpec,
        id: ManagedIdentity,
        message: String,
    ) -> InvitationRecord {
        InvitationRecord {
            id,
            org: spec.org.clone(),
            flow: spec.flow.clone(),
            email: spec.email.clone(),
            message,
            username: spec.username.clone(),
            manager: spec.manager.clone(),
            ticket_number: spec.ticket_number.clone(),
        }
    }
}
