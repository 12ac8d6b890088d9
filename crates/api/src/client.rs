//! Flowline HTTP Client Implementation
//!
//! Real HTTP client for the Flowline REST API. The API token travels as the
//! userinfo component of the base URL (`https://{token}@api.flowline.app`);
//! no separate auth header scheme is used.

use std::time::Duration;

use crate::{ApiConfig, ApiError, FlowlineService, Invitation, User};

const DEFAULT_BASE_URL: &str = "https://api.flowline.app";

/// Real Flowline REST client.
pub struct FlowlineClient {
    http: reqwest::Client,
    base_url: String,
}

impl FlowlineClient {
    /// Create a new Flowline client from configuration.
    ///
    /// Fails with [`ApiError::Configuration`] when the token is blank or the
    /// base URL does not parse.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let token = config.api_token.trim();
        if token.is_empty() {
            return Err(ApiError::Configuration(
                "can't run with an empty token".to_string(),
            ));
        }

        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let mut url = reqwest::Url::parse(base)
            .map_err(|e| ApiError::Configuration(format!("invalid base URL {}: {}", base, e)))?;
        url.set_username(token)
            .map_err(|_| ApiError::Configuration(format!("base URL {} cannot carry a token", base)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Configuration(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: url.to_string().trim_end_matches('/').to_string(),
        })
    }

    /// The effective base URL, token embedded as userinfo.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| ApiError::DeleteFailed(format!("delete request failed: {}", e)))?;

        // Success is strictly 204 No Content.
        if response.status() != reqwest::StatusCode::NO_CONTENT {
            return Err(ApiError::DeleteFailed(format!(
                "unexpected status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl FlowlineService for FlowlineClient {
    async fn get_user_by_id(&self, user_id: i64) -> Result<User, ApiError> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        tracing::debug!(user_id, "Fetching Flowline user");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("get user {} failed: {}", user_id, e)))?;

        // Missing resources come back as empty or malformed bodies; both
        // decode to the zero-id sentinel.
        let user: User = response.json().await.unwrap_or_default();
        if user.id == 0 {
            return Err(ApiError::NotFound(format!(
                "no matching user with id {}",
                user_id
            )));
        }
        Ok(user)
    }

    async fn get_invitation_by_invite_id(
        &self,
        org: &str,
        flow: &str,
        invite_id: i64,
    ) -> Result<Invitation, ApiError> {
        let url = format!(
            "{}/flows/{}/{}/invitations/{}",
            self.base_url, org, flow, invite_id
        );
        tracing::debug!(org, flow, invite_id, "Fetching Flowline invitation");

        let response = self.http.get(&url).send().await.map_err(|e| {
            ApiError::Transport(format!("get invitation {} failed: {}", invite_id, e))
        })?;

        let invitation: Invitation = response.json().await.unwrap_or_default();
        if invitation.id == 0 {
            return Err(ApiError::NotFound(format!(
                "no matching invitation with id {}",
                invite_id
            )));
        }
        Ok(invitation)
    }

    async fn invite_new_user(
        &self,
        email: &str,
        message: &str,
        org: &str,
        flow: &str,
    ) -> Result<Invitation, ApiError> {
        let url = format!("{}/flows/{}/{}/invitations", self.base_url, org, flow);
        let params = [("email", email), ("message", message)];
        tracing::debug!(org, flow, email, "Inviting new Flowline user");

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("invite {} failed: {}", email, e)))?;

        let status = response.status();
        let invitation: Invitation = response.json().await.unwrap_or_default();
        if invitation.id == 0 {
            // Rejections (403 and friends) parse into a zero-id body whose
            // message field carries the server's reason.
            let reason = if invitation.server_message.is_empty() {
                format!("invitation was not created (HTTP {})", status)
            } else {
                invitation.server_message
            };
            return Err(ApiError::Rejected(reason));
        }
        Ok(invitation)
    }

    async fn add_user_to_flow(&self, org: &str, flow: &str, user_id: i64) -> Result<(), ApiError> {
        let url = format!("{}/flows/{}/{}/users", self.base_url, org, flow);
        let params = [("id", user_id.to_string())];
        tracing::debug!(org, flow, user_id, "Adding Flowline user to flow");

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("add user {} failed: {}", user_id, e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Rejected(format!(
                "add user {} to {}/{} failed (HTTP {})",
                user_id,
                org,
                flow,
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete_user_from_org(&self, org: &str, user_id: i64) -> Result<(), ApiError> {
        let url = format!("{}/organizations/{}/users/{}", self.base_url, org, user_id);
        tracing::debug!(org, user_id, "Deleting Flowline user from organization");
        self.delete_by_url(&url).await
    }

    async fn delete_invitation_by_id(
        &self,
        org: &str,
        flow: &str,
        invite_id: i64,
    ) -> Result<(), ApiError> {
        let url = format!(
            "{}/flows/{}/{}/invitations/{}",
            self.base_url, org, flow, invite_id
        );
        tracing::debug!(org, flow, invite_id, "Deleting Flowline invitation");
        self.delete_by_url(&url).await
    }

    async fn get_user_id_by_email(&self, org: &str, email: &str) -> Result<String, ApiError> {
        let url = format!("{}/organizations/{}/users", self.base_url, org);
        tracing::debug!(org, email, "Scanning organization directory");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("list users of {} failed: {}", org, e)))?;

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(format!("read user list body failed: {}", e)))?;

        let users: Vec<User> = serde_json::from_str(&body)
            .map_err(|e| ApiError::Decode(format!("unexpected user list payload: {}", e)))?;

        for user in &users {
            if user.email == email {
                return Ok(user.id.to_string());
            }
        }

        tracing::debug!(org, email, "No matching member in organization directory");
        Err(ApiError::NoMatch(email.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base_url: &str) -> ApiConfig {
        ApiConfig {
            provider: "flowline".to_string(),
            api_token: "apiKey".to_string(),
            base_url: Some(base_url.to_string()),
            timeout_secs: 10,
        }
    }

    // CLI-U01: construction embeds a non-blank token verbatim as userinfo
    #[test]
    fn test_new_embeds_token_as_userinfo() {
        let client = FlowlineClient::new(ApiConfig {
            provider: "flowline".to_string(),
            api_token: "test".to_string(),
            base_url: None,
            timeout_secs: 10,
        })
        .unwrap();
        assert_eq!(client.base_url(), "https://test@api.flowline.app");
    }

    // CLI-U02: empty or whitespace-only token -> Configuration error
    #[test]
    fn test_new_rejects_blank_token() {
        for token in ["", "   ", "\t\n"] {
            let result = FlowlineClient::new(ApiConfig {
                provider: "flowline".to_string(),
                api_token: token.to_string(),
                base_url: None,
                timeout_secs: 10,
            });
            assert!(
                matches!(result, Err(ApiError::Configuration(_))),
                "token {:?} should be rejected",
                token
            );
        }
    }

    // CLI-U03: invite against a 403 Access denied body -> Rejected
    #[tokio::test]
    async fn test_invite_new_user_access_denied() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/flows/acme/flow1/invitations"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"message": "Access denied"})),
            )
            .mount(&server)
            .await;

        let client = FlowlineClient::new(config_for(&server.uri())).unwrap();
        let err = client
            .invite_new_user("e@x", "hello", "acme", "flow1")
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Rejected("Access denied".to_string()));
    }

    // CLI-U04: invite against a 200 invitation body succeeds
    #[tokio::test]
    async fn test_invite_new_user_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/flows/acme/flow1/invitations"))
            .and(body_string_contains("email=e%40x"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1413413,
                "email": "e@x",
                "state": "pending",
                "url": "https://api.flowline.app/flows/acme/flow1/invitations/1413413"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = FlowlineClient::new(config_for(&server.uri())).unwrap();
        let invitation = client
            .invite_new_user("e@x", "hello", "acme", "flow1")
            .await
            .unwrap();
        assert_eq!(invitation.id, 1413413);
        assert_eq!(invitation.email, "e@x");
        assert_eq!(invitation.state, "pending");
    }

    // CLI-U05: deletes succeed strictly on 204
    #[tokio::test]
    async fn test_delete_user_from_org_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/organizations/acme/users/123456"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = FlowlineClient::new(config_for(&server.uri())).unwrap();
        client.delete_user_from_org("acme", 123456).await.unwrap();
    }

    // CLI-U06: any non-204 delete response -> DeleteFailed
    #[tokio::test]
    async fn test_delete_invitation_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/flows/acme/flow1/invitations/99"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})),
            )
            .mount(&server)
            .await;

        let client = FlowlineClient::new(config_for(&server.uri())).unwrap();
        let err = client
            .delete_invitation_by_id("acme", "flow1", 99)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::DeleteFailed(_)));
    }

    // CLI-U07: directory scan returns the first exact email match as a string
    #[tokio::test]
    async fn test_get_user_id_by_email_scan() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/organizations/acme/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 123456, "email": "a@x", "name": "a", "nick": "a"},
                {"id": 654321, "email": "b@x", "name": "b", "nick": "b"}
            ])))
            .mount(&server)
            .await;

        let client = FlowlineClient::new(config_for(&server.uri())).unwrap();
        assert_eq!(
            client.get_user_id_by_email("acme", "a@x").await.unwrap(),
            "123456"
        );
        assert_eq!(
            client.get_user_id_by_email("acme", "b@x").await.unwrap(),
            "654321"
        );
        assert_eq!(
            client.get_user_id_by_email("acme", "c@x").await.unwrap_err(),
            ApiError::NoMatch("c@x".to_string())
        );
    }

    // CLI-U08: an unparseable directory body -> Decode, never a silent miss
    #[tokio::test]
    async fn test_get_user_id_by_email_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/organizations/acme/users"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = FlowlineClient::new(config_for(&server.uri())).unwrap();
        let err = client.get_user_id_by_email("acme", "c@x").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    // CLI-U09: zero-id user body -> NotFound
    #[tokio::test]
    async fn test_get_user_by_id_zero_id_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = FlowlineClient::new(config_for(&server.uri())).unwrap();
        let err = client.get_user_by_id(42).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    // CLI-U10: user and invitation GETs decode populated bodies
    #[tokio::test]
    async fn test_get_user_and_invitation_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/350495"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 350495,
                "email": "mickey.mouse@example.com",
                "name": "Mickey Mouse",
                "nick": "mickey"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flows/acme/flow1/invitations/77"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 77,
                "email": "e@x",
                "state": "pending",
                "url": "https://api.flowline.app/flows/acme/flow1/invitations/77"
            })))
            .mount(&server)
            .await;

        let client = FlowlineClient::new(config_for(&server.uri())).unwrap();
        let user = client.get_user_by_id(350495).await.unwrap();
        assert_eq!(user.email, "mickey.mouse@example.com");
        assert_eq!(user.name, "Mickey Mouse");

        let invitation = client
            .get_invitation_by_invite_id("acme", "flow1", 77)
            .await
            .unwrap();
        assert_eq!(invitation.id, 77);
    }
}
