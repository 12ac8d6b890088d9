//! Organization resource adapter
//!
//! Organizations are read-only on the remote service. Create and update
//! assign the contact email as the local identity; read and delete are
//! no-ops with no remote calls.

use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::{ProvisionError, Result};

/// Desired state for an organization placeholder, as supplied by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationSpec {
    pub email: String,
    pub message: String,
}

/// Resolved observable state for an organization placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: String,
    pub email: String,
    pub message: String,
}

/// Manages the local organization placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizationProvisioner;

impl OrganizationProvisioner {
    pub fn new() -> Self {
        Self
    }

    /// Assign the email as the local identity.
    pub fn create(&self, spec: &OrganizationSpec) -> Result<OrganizationRecord> {
        if !spec.email.validate_email() {
            return Err(ProvisionError::Validation(format!(
                "invalid email address {:?}",
                spec.email
            )));
        }
        Ok(OrganizationRecord {
            id: spec.email.clone(),
            email: spec.email.clone(),
            message: spec.message.clone(),
        })
    }

    /// Read leaves the record unchanged.
    pub fn read(&self, record: &OrganizationRecord) -> OrganizationRecord {
        record.clone()
    }

    /// Update re-assigns the identity from the spec, like create.
    pub fn update(&self, spec: &OrganizationSpec) -> Result<OrganizationRecord> {
        self.create(spec)
    }

    /// Delete is a local no-op.
    pub fn delete(&self, _record: &OrganizationRecord) {}
}
