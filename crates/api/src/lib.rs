//! Flowline API Service
//!
//! Provides a typed client for the Flowline REST API with support for:
//! - Real HTTP client for production use
//! - Mock service for testing and development
//! - Configurable API token, base URL, and request timeout

pub mod client;
pub mod mock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Flowline configuration error: {0}")]
    Configuration(String),

    #[error("Flowline transport error: {0}")]
    Transport(String),

    #[error("Flowline decode error: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rejected by Flowline: {0}")]
    Rejected(String),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("no user found by the email {0}")]
    NoMatch(String),
}

/// A Flowline user, as seen by `GET /users/:id`.
///
/// The service answers missing resources with empty or partial bodies, so
/// every field defaults; a zero `id` means "no such user".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub nick: String,
    #[serde(rename = "message")]
    pub server_message: String,
}

/// A pending invitation, as seen by `GET /flows/:org/:flow/invitations/:id`.
///
/// Same zero-id convention as [`User`]; rejected mutations come back as a
/// zero-id body whose `message` field carries the server's reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Invitation {
    pub id: i64,
    pub email: String,
    pub state: String,
    pub url: String,
    #[serde(rename = "message")]
    pub server_message: String,
}

/// An organization, as seen by `GET /organizations/:org`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub id: i64,
    #[serde(rename = "parameterized_name")]
    pub api_name: String,
    pub name: String,
    #[serde(rename = "url")]
    pub api_url: String,
    pub users: Vec<User>,
    #[serde(rename = "message")]
    pub server_message: String,
}

/// Flowline service configuration.
#[derive(Clone)]
pub struct ApiConfig {
    /// Flowline provider (flowline, mock)
    pub provider: String,
    /// API token for authenticating with the Flowline REST API
    pub api_token: String,
    /// Base URL override (self-hosted instances, tests)
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("provider", &self.provider)
            .field("api_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ApiConfig {
    /// Create Flowline config from environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        dotenvy::dotenv().ok();

        let provider =
            std::env::var("FLOWLINE_PROVIDER").unwrap_or_else(|_| "flowline".to_string());

        let api_token = std::env::var("FLOWLINE_TOKEN").unwrap_or_else(|_| {
            if provider == "mock" {
                "mock-token".to_string()
            } else {
                String::new()
            }
        });

        let base_url = std::env::var("FLOWLINE_BASE_URL").ok();

        let timeout_secs = std::env::var("FLOWLINE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        if provider != "mock" && api_token.trim().is_empty() {
            return Err(ApiError::Configuration(
                "FLOWLINE_TOKEN is required for the flowline provider".to_string(),
            ));
        }

        Ok(Self {
            provider,
            api_token,
            base_url,
            timeout_secs,
        })
    }
}

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Flowline service trait for different implementations.
///
/// Every operation is a single request/response round trip; no retries are
/// performed at this layer. Callers own any retry policy.
#[async_trait::async_trait]
pub trait FlowlineService: Send + Sync {
    /// Fetch a user by its server-assigned id.
    async fn get_user_by_id(&self, user_id: i64) -> Result<User, ApiError>;

    /// Fetch a pending invitation by its server-assigned id.
    async fn get_invitation_by_invite_id(
        &self,
        org: &str,
        flow: &str,
        invite_id: i64,
    ) -> Result<Invitation, ApiError>;

    /// Invite a new user to a flow by email.
    async fn invite_new_user(
        &self,
        email: &str,
        message: &str,
        org: &str,
        flow: &str,
    ) -> Result<Invitation, ApiError>;

    /// Add an existing organization member to a flow.
    async fn add_user_to_flow(&self, org: &str, flow: &str, user_id: i64) -> Result<(), ApiError>;

    /// Remove a user from an organization.
    async fn delete_user_from_org(&self, org: &str, user_id: i64) -> Result<(), ApiError>;

    /// Revoke a pending invitation.
    async fn delete_invitation_by_id(
        &self,
        org: &str,
        flow: &str,
        invite_id: i64,
    ) -> Result<(), ApiError>;

    /// Resolve an organization member's id by exact email match.
    ///
    /// Returns the first matching id as a decimal string, or
    /// [`ApiError::NoMatch`] when the directory holds no such member.
    /// `NoMatch` is a branch signal for callers, not necessarily a failure.
    async fn get_user_id_by_email(&self, org: &str, email: &str) -> Result<String, ApiError>;
}

/// Factory for creating FlowlineService implementations.
pub struct FlowlineServiceFactory;

impl FlowlineServiceFactory {
    /// Create a FlowlineService based on configuration.
    pub fn create(config: ApiConfig) -> Result<Box<dyn FlowlineService>, ApiError> {
        match config.provider.as_str() {
            "flowline" => {
                tracing::info!("Creating Flowline REST client");
                Ok(Box::new(client::FlowlineClient::new(config)?))
            }
            "mock" => {
                tracing::info!("Creating mock Flowline service");
                Ok(Box::new(mock::MockFlowlineService::new()))
            }
            provider => Err(ApiError::Configuration(format!(
                "Unknown Flowline provider: {}. Supported providers: flowline, mock",
                provider
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // API-U01: ApiConfig with valid flowline provider fields
    #[test]
    fn test_config_valid_flowline_provider() {
        let config = ApiConfig {
            provider: "flowline".to_string(),
            api_token: "test-token-123".to_string(),
            base_url: None,
            timeout_secs: 10,
        };
        assert_eq!(config.provider, "flowline");
        assert_eq!(config.api_token, "test-token-123");
        assert_eq!(config.base_url, None);
        assert_eq!(config.timeout_secs, 10);
    }

    // API-U02: ApiConfig Debug output never leaks the token
    #[test]
    fn test_config_debug_redacts_token() {
        let config = ApiConfig {
            provider: "flowline".to_string(),
            api_token: "super-secret".to_string(),
            base_url: None,
            timeout_secs: 10,
        };
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("super-secret"));
    }

    // API-U03: FlowlineServiceFactory rejects flowline provider with blank token
    #[test]
    fn test_factory_rejects_flowline_with_blank_token() {
        let config = ApiConfig {
            provider: "flowline".to_string(),
            api_token: "   ".to_string(),
            base_url: None,
            timeout_secs: 10,
        };
        let result = FlowlineServiceFactory::create(config);
        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }

    // API-U04: FlowlineServiceFactory::create("mock") -> Ok
    #[test]
    fn test_factory_mock_succeeds() {
        let config = ApiConfig {
            provider: "mock".to_string(),
            api_token: String::new(),
            base_url: None,
            timeout_secs: 10,
        };
        let result = FlowlineServiceFactory::create(config);
        assert!(result.is_ok());
    }

    // API-U05: FlowlineServiceFactory::create("invalid") -> Err
    #[test]
    fn test_factory_unknown_provider() {
        let config = ApiConfig {
            provider: "invalid".to_string(),
            api_token: "token".to_string(),
            base_url: None,
            timeout_secs: 10,
        };
        let err = match FlowlineServiceFactory::create(config) {
            Err(e) => e,
            Ok(_) => panic!("Expected error for unknown provider"),
        };
        assert!(err
            .to_string()
            .contains("Unknown Flowline provider: invalid"));
    }

    // API-U06: sparse user body decodes to the zero-id sentinel
    #[test]
    fn test_user_decode_sparse_body() {
        let user: User = serde_json::from_str("{}").unwrap();
        assert_eq!(user.id, 0);
        assert_eq!(user.email, "");

        let user: User = serde_json::from_str(r#"{"message":"Access denied"}"#).unwrap();
        assert_eq!(user.id, 0);
        assert_eq!(user.server_message, "Access denied");
    }

    // API-U07: full invitation body decodes with the message rename applied
    #[test]
    fn test_invitation_decode_full_body() {
        let body = r#"
        {
            "id": 1413413,
            "email": "e@x",
            "state": "pending",
            "url": "https://api.flowline.app/flows/acme/flow1/invitations/1413413",
            "message": "welcome"
        }
        "#;
        let invitation: Invitation = serde_json::from_str(body).unwrap();
        assert_eq!(invitation.id, 1413413);
        assert_eq!(invitation.email, "e@x");
        assert_eq!(invitation.state, "pending");
        assert_eq!(invitation.server_message, "welcome");
    }

    // API-U08: organization body decodes with renamed wire fields
    #[test]
    fn test_organization_decode_renamed_fields() {
        let body = r#"
        {
            "id": 42,
            "parameterized_name": "acme",
            "name": "Acme Inc",
            "url": "https://api.flowline.app/organizations/acme",
            "users": [{"id": 7, "email": "a@x", "name": "A", "nick": "a"}]
        }
        "#;
        let org: Organization = serde_json::from_str(body).unwrap();
        assert_eq!(org.id, 42);
        assert_eq!(org.api_name, "acme");
        assert_eq!(org.api_url, "https://api.flowline.app/organizations/acme");
        assert_eq!(org.users.len(), 1);
        assert_eq!(org.users[0].id, 7);
    }

    // API-U09: ApiError variants have correct Display output
    #[test]
    fn test_error_display() {
        let config_err = ApiError::Configuration("empty token".to_string());
        assert_eq!(
            config_err.to_string(),
            "Flowline configuration error: empty token"
        );

        let transport_err = ApiError::Transport("connection refused".to_string());
        assert_eq!(
            transport_err.to_string(),
            "Flowline transport error: connection refused"
        );

        let rejected_err = ApiError::Rejected("Access denied".to_string());
        assert_eq!(
            rejected_err.to_string(),
            "rejected by Flowline: Access denied"
        );

        let no_match = ApiError::NoMatch("c@x".to_string());
        assert_eq!(no_match.to_string(), "no user found by the email c@x");
    }
}
