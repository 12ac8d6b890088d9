//! Managed identity tracking for reconciled entities

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProvisionError;

/// Marker prepended to adopted user ids in the string encoding.
///
/// A decimal integer can never start with this byte, so the user and
/// invitation id spaces stay disjoint in their encoded form.
const USER_MARKER: char = 'u';

/// What a reconciled entity currently is: an existing organization member
/// adopted by user id, or a pending invitation tracked by invitation id.
/// Exactly one variant is active per entity at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ManagedIdentity {
    User(i64),
    Invitation(i64),
}

impl ManagedIdentity {
    /// The server-assigned id behind either variant.
    pub fn raw_id(&self) -> i64 {
        match self {
            Self::User(id) | Self::Invitation(id) => *id,
        }
    }

    /// True when the entity names an adopted organization member.
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User(_))
    }

    /// True when the entity names a pending invitation.
    pub fn is_invitation(&self) -> bool {
        matches!(self, Self::Invitation(_))
    }
}

impl fmt::Display for ManagedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{}{}", USER_MARKER, id),
            Self::Invitation(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for ManagedIdentity {
    type Err = ProvisionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (variant, digits): (fn(i64) -> Self, &str) = match raw.strip_prefix(USER_MARKER) {
            Some(rest) => (Self::User, rest),
            None => (Self::Invitation, raw),
        };
        match digits.parse::<i64>() {
            // Zero is the remote "no such resource" sentinel, never a real id.
            Ok(id) if id > 0 => Ok(variant(id)),
            _ => Err(ProvisionError::Identity(format!(
                "malformed identity {:?}",
                raw
            ))),
        }
    }
}

impl From<ManagedIdentity> for String {
    fn from(id: ManagedIdentity) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for ManagedIdentity {
    type Error = ProvisionError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

/// Composite external key `{user_id}_{flow}_{org}` handed over on import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportKey {
    pub user_id: i64,
    pub flow: String,
    pub org: String,
}

impl ImportKey {
    const DELIMITER: char = '_';

    /// Whether a raw identifier carries the composite form at all.
    pub fn is_composite(raw: &str) -> bool {
        raw.contains(Self::DELIMITER)
    }

    /// Parse a composite key: exactly three non-empty fields, user id first.
    pub fn parse(raw: &str) -> Result<Self, ProvisionError> {
        let fields: Vec<&str> = raw.split(Self::DELIMITER).collect();
        match fields.as_slice() {
            [user_id, flow, org] if !flow.is_empty() && !org.is_empty() => {
                let user_id = match user_id.parse::<i64>() {
                    Ok(id) if id > 0 => id,
                    _ => {
                        return Err(ProvisionError::Identity(format!(
                            "import key {:?} must start with a numeric user id",
                            raw
                        )))
                    }
                };
                Ok(Self {
                    user_id,
                    flow: (*flow).to_string(),
                    org: (*org).to_string(),
                })
            }
            _ => Err(ProvisionError::Identity(format!(
                "import key {:?} must have the form user-id_flow_org",
                raw
            ))),
        }
    }
}
