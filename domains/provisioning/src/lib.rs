//! Provisioning domain: invitation reconciliation, organization and user adapters
//!
//! The reconciler decides, for a desired org/flow/email, whether the target
//! already exists as an organization member (adopt by user id) or must be
//! newly invited (track by invitation id), and classifies the inverse on
//! delete. The organization and user adapters are thin one-call wrappers.

pub mod content;
pub mod identity;
pub mod invitation;
pub mod organization;
pub mod user;

use thiserror::Error;

use flowline_api::ApiError;

/// Provisioning result type
pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Errors surfaced to the orchestration host.
///
/// Client failures pass through unchanged so the host can branch on the
/// structured kind rather than on message text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProvisionError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Identity error: {0}")]
    Identity(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

// Re-export domain types at the crate root for convenience
pub use identity::{ImportKey, ManagedIdentity};
pub use invitation::{InvitationProvisioner, InvitationRecord, InvitationSpec};
pub use organization::{OrganizationProvisioner, OrganizationRecord, OrganizationSpec};
pub use user::{UserProvisioner, UserRecord, UserSpec};
