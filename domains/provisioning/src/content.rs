//! Shared invitation message content
//!
//! Canonical content generator for the templated invitation message, used
//! when the host supplies the structured username/manager/ticket form
//! instead of free text.

/// Render the fixed invitation message addressed to the invitee.
pub fn invitation_message(username: &str, manager: &str, ticket_number: &str) -> String {
    format!(
        "Hi {},\n\n\
        {} has requested that you be added to this organization's flows.\n\
        The request is tracked as ticket {}.\n\n\
        Follow the link in this invitation to join.",
        username, manager, ticket_number
    )
}
