use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "portfolio_session";
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);
const MAX_NAME_CHARS: usize = 40;

struct Session {
    user: String,
    created: Instant,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) < SESSION_TTL
    }
}

/// In-memory login sessions keyed by an opaque cookie token. Sessions expire
/// after [`SESSION_TTL`] and are swept whenever a new one starts.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session for `name` and returns its token.
    pub async fn create(&self, name: &str) -> String {
        self.create_at(name, Instant::now()).await
    }

    pub async fn create_at(&self, name: &str, now: Instant) -> String {
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, session| session.is_live(now));
        sessions.insert(
            token.clone(),
            Session {
                user: name.to_string(),
                created: now,
            },
        );
        token
    }

    pub async fn user(&self, token: &str) -> Option<String> {
        self.user_at(token, Instant::now()).await
    }

    pub async fn user_at(&self, token: &str, now: Instant) -> Option<String> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get(token)?;
        if session.is_live(now) {
            return Some(session.user.clone());
        }
        sessions.remove(token);
        None
    }

    pub async fn user_for(&self, headers: &HeaderMap) -> Option<String> {
        let token = session_token(headers)?;
        self.user(&token).await
    }

    pub async fn remove(&self, token: &str) -> Option<String> {
        self.sessions
            .lock()
            .await
            .remove(token)
            .map(|session| session.user)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Pulls the session token out of the request's `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

pub fn session_cookie(token: &str) -> String {
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_TTL.as_secs()
    )
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Trims a requested display name; `None` when nothing usable is left.
pub fn normalize_name(raw: &str) -> Option<String> {
    let name: String = raw
        .trim()
        .chars()
        .filter(|ch| !ch.is_control())
        .take(MAX_NAME_CHARS)
        .collect();
    let name = name.trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_is_found_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; portfolio_session=abc-123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn missing_or_empty_token_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("portfolio_session="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(normalize_name("  Ada  ").as_deref(), Some("Ada"));
        assert_eq!(normalize_name("   "), None);
        let long = "x".repeat(100);
        assert_eq!(normalize_name(&long).map(|n| n.len()), Some(MAX_NAME_CHARS));
    }

    #[tokio::test]
    async fn sessions_round_trip_and_expire_on_remove() {
        let store = SessionStore::new();
        let token = store.create("ada").await;
        assert_eq!(store.user(&token).await.as_deref(), Some("ada"));
        assert_eq!(store.remove(&token).await.as_deref(), Some("ada"));
        assert_eq!(store.user(&token).await, None);
    }

    #[tokio::test]
    async fn expired_sessions_are_refused_and_swept() {
        let store = SessionStore::new();
        let start = Instant::now();
        let stale = store.create_at("old", start).await;
        let fresh_start = start + SESSION_TTL / 2;
        let fresh = store.create_at("new", fresh_start).await;
        assert_eq!(store.active_count().await, 2);

        let expired = start + SESSION_TTL + Duration::from_secs(1);
        assert_eq!(store.user_at(&stale, expired).await, None);
        assert_eq!(store.user_at(&fresh, expired).await.as_deref(), Some("new"));
        assert_eq!(store.active_count().await, 1);
    }

    #[tokio::test]
    async fn anonymous_logins_do_not_pile_up_past_the_ttl() {
        let store = SessionStore::new();
        let start = Instant::now();
        for attempt in 0..1_000 {
            store.create_at(&format!("visitor-{attempt}"), start).await;
        }
        assert_eq!(store.active_count().await, 1_000);

        store
            .create_at("late", start + SESSION_TTL + Duration::from_secs(1))
            .await;
        assert_eq!(store.active_count().await, 1);
    }
}
