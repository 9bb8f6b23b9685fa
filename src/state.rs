use crate::catalog::{self, SectionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Comment {
    #[serde(rename = "user")]
    pub author: String,
    pub text: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub logged_in: bool,
    #[serde(default)]
    pub login_url: Option<String>,
    #[serde(default)]
    pub logout_url: Option<String>,
}

/// Where the interpreter is in its prompt lifecycle. Independent of whether
/// the panel is currently visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing armed yet on this page load.
    Idle,
    Tutorial,
    Prompt,
    Processing,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub is_open: bool,
    /// `None` until the durable flag has been read on first open.
    pub has_shown_tutorial: Option<bool>,
    pub phase: Phase,
    pub current_section: SectionId,
    pub last_submitted_input: Option<String>,
    pub comments_loaded: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            is_open: false,
            has_shown_tutorial: None,
            phase: Phase::Idle,
            current_section: catalog::INITIAL_SECTION,
            last_submitted_input: None,
            comments_loaded: false,
        }
    }

    pub fn remember_input(&mut self, input: &str) {
        let trimmed = input.trim();
        if !trimmed.is_empty() {
            self.last_submitted_input = Some(trimmed.to_string());
        }
    }

    /// Swaps the visible section, returning the one to hide.
    pub fn navigate(&mut self, section: SectionId) -> SectionId {
        std::mem::replace(&mut self.current_section, section)
    }

    /// Claims the comment load. Returns `false` when a load already ran or is
    /// in flight.
    pub fn claim_comment_load(&mut self) -> bool {
        if self.comments_loaded {
            return false;
        }
        self.comments_loaded = true;
        true
    }

    pub fn release_comment_load(&mut self) {
        self.comments_loaded = false;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_closed_on_initial_section() {
        let session = Session::new();
        assert!(!session.is_open);
        assert_eq!(session.phase, Phase::Idle);
        assert_eq!(session.current_section, SectionId::Whoami);
        assert_eq!(session.has_shown_tutorial, None);
        assert!(session.last_submitted_input.is_none());
    }

    #[test]
    fn remember_input_ignores_blank_lines() {
        let mut session = Session::new();
        session.remember_input("  ls  ");
        session.remember_input("   ");
        assert_eq!(session.last_submitted_input.as_deref(), Some("ls"));
        session.remember_input("cat whoami");
        assert_eq!(session.last_submitted_input.as_deref(), Some("cat whoami"));
    }

    #[test]
    fn navigate_returns_previous_section() {
        let mut session = Session::new();
        assert_eq!(session.navigate(SectionId::Skills), SectionId::Whoami);
        assert_eq!(session.navigate(SectionId::Projects), SectionId::Skills);
        assert_eq!(session.current_section, SectionId::Projects);
    }

    #[test]
    fn comment_load_is_claimed_once() {
        let mut session = Session::new();
        assert!(session.claim_comment_load());
        assert!(!session.claim_comment_load());
        session.release_comment_load();
        assert!(session.claim_comment_load());
    }

    #[test]
    fn comment_uses_user_on_the_wire() {
        let comment: Comment =
            serde_json::from_str(r#"{"user":"ada","text":"hi","timestamp":12}"#)
                .expect("comment should decode");
        assert_eq!(comment.author, "ada");
        let encoded = serde_json::to_string(&comment).expect("comment should encode");
        assert!(encoded.contains("\"user\":\"ada\""), "{encoded}");
    }

    #[test]
    fn auth_status_urls_are_optional() {
        let status: AuthStatus =
            serde_json::from_str(r#"{"loggedIn":false,"loginUrl":"/login"}"#)
                .expect("auth should decode");
        assert!(!status.logged_in);
        assert_eq!(status.login_url.as_deref(), Some("/login"));
        assert_eq!(status.logout_url, None);
    }
}
