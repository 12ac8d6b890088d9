//! Mock Flowline Service Implementation
//!
//! In-memory organization directory and invitation store, with a recorded
//! call log for call-count assertions. Thread-safe via `Arc<Mutex<>>`.
//! Failure outcomes are programmable per test case.

use std::sync::{Arc, Mutex};

use crate::{ApiError, FlowlineService, Invitation, User};

/// Mock Flowline service that records calls for test assertions.
#[derive(Debug, Clone)]
pub struct MockFlowlineService {
    users: Arc<Mutex<Vec<User>>>,
    invitations: Arc<Mutex<Vec<Invitation>>>,
    next_invite_id: Arc<Mutex<i64>>,
    lookup_error: Arc<Mutex<Option<ApiError>>>,
    invite_rejection: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFlowlineService {
    /// Create a new mock Flowline service with an empty directory.
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(Vec::new())),
            invitations: Arc::new(Mutex::new(Vec::new())),
            // Ids the remote would plausibly assign; zero stays reserved
            // for the not-found sentinel.
            next_invite_id: Arc::new(Mutex::new(1_000_001)),
            lookup_error: Arc::new(Mutex::new(None)),
            invite_rejection: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Seed an organization member into the directory.
    pub fn seed_user(&self, user: User) {
        self.users
            .lock()
            .expect("users lock poisoned — prior test panicked")
            .push(user);
    }

    /// Seed a pending invitation.
    pub fn seed_invitation(&self, invitation: Invitation) {
        self.invitations
            .lock()
            .expect("invitations lock poisoned — prior test panicked")
            .push(invitation);
    }

    /// Script the next directory lookup to fail with the given error.
    pub fn set_lookup_error(&self, error: ApiError) {
        *self
            .lookup_error
            .lock()
            .expect("lookup_error lock poisoned — prior test panicked") = Some(error);
    }

    /// Script all invitation POSTs to fail with a server message.
    pub fn reject_invitations(&self, message: &str) {
        *self
            .invite_rejection
            .lock()
            .expect("invite_rejection lock poisoned — prior test panicked") =
            Some(message.to_string());
    }

    /// Return all recorded calls, oldest first.
    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock poisoned — prior test panicked")
            .clone()
    }

    /// Count recorded calls to a single operation.
    pub fn calls_to(&self, operation: &str) -> usize {
        self.recorded_calls()
            .iter()
            .filter(|call| call.starts_with(operation))
            .count()
    }

    /// Clear the directory, invitations, scripted outcomes, and call log.
    pub fn reset(&self) {
        self.users.lock().expect("users lock poisoned").clear();
        self.invitations
            .lock()
            .expect("invitations lock poisoned")
            .clear();
        *self.lookup_error.lock().expect("lookup_error lock poisoned") = None;
        *self
            .invite_rejection
            .lock()
            .expect("invite_rejection lock poisoned") = None;
        self.calls.lock().expect("calls lock poisoned").clear();
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        tracing::debug!(call = %call, "Mock Flowline: recording call");
        self.calls
            .lock()
            .map_err(|e| ApiError::Transport(format!("calls lock poisoned: {}", e)))?
            .push(call);
        Ok(())
    }
}

impl Default for MockFlowlineService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FlowlineService for MockFlowlineService {
    async fn get_user_by_id(&self, user_id: i64) -> Result<User, ApiError> {
        self.record(format!("get_user_by_id {}", user_id))?;
        self.users
            .lock()
            .map_err(|e| ApiError::Transport(format!("users lock poisoned: {}", e)))?
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("no matching user with id {}", user_id)))
    }

    async fn get_invitation_by_invite_id(
        &self,
        org: &str,
        flow: &str,
        invite_id: i64,
    ) -> Result<Invitation, ApiError> {
        self.record(format!(
            "get_invitation_by_invite_id {}/{} {}",
            org, flow, invite_id
        ))?;
        self.invitations
            .lock()
            .map_err(|e| ApiError::Transport(format!("invitations lock poisoned: {}", e)))?
            .iter()
            .find(|invitation| invitation.id == invite_id)
            .cloned()
            .ok_or_else(|| {
                ApiError::NotFound(format!("no matching invitation with id {}", invite_id))
            })
    }

    async fn invite_new_user(
        &self,
        email: &str,
        message: &str,
        org: &str,
        flow: &str,
    ) -> Result<Invitation, ApiError> {
        self.record(format!("invite_new_user {}/{} {}", org, flow, email))?;

        if let Some(reason) = self
            .invite_rejection
            .lock()
            .map_err(|e| ApiError::Transport(format!("invite_rejection lock poisoned: {}", e)))?
            .clone()
        {
            return Err(ApiError::Rejected(reason));
        }

        let id = {
            let mut next = self
                .next_invite_id
                .lock()
                .map_err(|e| ApiError::Transport(format!("next_invite_id lock poisoned: {}", e)))?;
            let id = *next;
            *next += 1;
            id
        };

        let invitation = Invitation {
            id,
            email: email.to_string(),
            state: "pending".to_string(),
            url: format!(
                "https://api.flowline.app/flows/{}/{}/invitations/{}",
                org, flow, id
            ),
            server_message: message.to_string(),
        };
        self.invitations
            .lock()
            .map_err(|e| ApiError::Transport(format!("invitations lock poisoned: {}", e)))?
            .push(invitation.clone());
        Ok(invitation)
    }

    async fn add_user_to_flow(&self, org: &str, flow: &str, user_id: i64) -> Result<(), ApiError> {
        self.record(format!("add_user_to_flow {}/{} {}", org, flow, user_id))
    }

    async fn delete_user_from_org(&self, org: &str, user_id: i64) -> Result<(), ApiError> {
        self.record(format!("delete_user_from_org {} {}", org, user_id))?;
        let mut users = self
            .users
            .lock()
            .map_err(|e| ApiError::Transport(format!("users lock poisoned: {}", e)))?;
        let before = users.len();
        users.retain(|user| user.id != user_id);
        if users.len() == before {
            return Err(ApiError::DeleteFailed(format!(
                "unexpected status 404 Not Found for user {}",
                user_id
            )));
        }
        Ok(())
    }

    async fn delete_invitation_by_id(
        &self,
        org: &str,
        flow: &str,
        invite_id: i64,
    ) -> Result<(), ApiError> {
        self.record(format!(
            "delete_invitation_by_id {}/{} {}",
            org, flow, invite_id
        ))?;
        let mut invitations = self
            .invitations
            .lock()
            .map_err(|e| ApiError::Transport(format!("invitations lock poisoned: {}", e)))?;
        let before = invitations.len();
        invitations.retain(|invitation| invitation.id != invite_id);
        if invitations.len() == before {
            return Err(ApiError::DeleteFailed(format!(
                "unexpected status 404 Not Found for invitation {}",
                invite_id
            )));
        }
        Ok(())
    }

    async fn get_user_id_by_email(&self, org: &str, email: &str) -> Result<String, ApiError> {
        self.record(format!("get_user_id_by_email {} {}", org, email))?;

        if let Some(error) = self
            .lookup_error
            .lock()
            .map_err(|e| ApiError::Transport(format!("lookup_error lock poisoned: {}", e)))?
            .take()
        {
            return Err(error);
        }

        self.users
            .lock()
            .map_err(|e| ApiError::Transport(format!("users lock poisoned: {}", e)))?
            .iter()
            .find(|user| user.email == email)
            .map(|user| user.id.to_string())
            .ok_or_else(|| ApiError::NoMatch(email.to_string()))
    }
}
