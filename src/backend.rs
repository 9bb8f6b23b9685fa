use crate::state::{AuthStatus, Comment};
use crate::utils;
use serde::de::DeserializeOwned;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestCredentials, RequestInit, RequestMode, Response, UrlSearchParams};

pub const AUTH_ROUTE: &str = "/auth";
pub const COMMENT_ROUTE: &str = "/comment";
const COMMENT_FIELD: &str = "comment";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// The comment service the terminal talks to.
#[allow(async_fn_in_trait)]
pub trait CommentBackend {
    async fn auth_status(&self) -> Result<AuthStatus, BackendError>;
    async fn list_comments(&self) -> Result<Vec<Comment>, BackendError>;
    async fn post_comment(&self, text: &str) -> Result<(), BackendError>;
}

pub struct HttpCommentBackend {
    auth_url: String,
    comment_url: String,
}

impl HttpCommentBackend {
    pub fn new(auth_url: String, comment_url: String) -> Self {
        Self {
            auth_url,
            comment_url,
        }
    }

    async fn send(&self, request: Request) -> Result<Response, BackendError> {
        let window = utils::window().ok_or_else(|| BackendError::Network("no window".into()))?;
        let response_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|err| network_error("Failed to reach backend", err))?;
        let response: Response = response_value
            .dyn_into()
            .map_err(|_| BackendError::Network("fetch did not return a Response".into()))?;
        if !response.ok() {
            return Err(BackendError::Status(response.status()));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::SameOrigin);
        opts.set_credentials(RequestCredentials::SameOrigin);
        let request = Request::new_with_str_and_init(url, &opts)
            .map_err(|err| network_error("Failed to create request", err))?;

        let response = self.send(request).await?;
        let text_future = response
            .text()
            .map_err(|err| network_error("Failed to read response body", err))?;
        let body = JsFuture::from(text_future)
            .await
            .map_err(|err| network_error("Failed to read response body", err))?
            .as_string()
            .unwrap_or_default();
        decode(&body)
    }
}

impl CommentBackend for HttpCommentBackend {
    async fn auth_status(&self) -> Result<AuthStatus, BackendError> {
        self.get_json(&self.auth_url).await
    }

    async fn list_comments(&self) -> Result<Vec<Comment>, BackendError> {
        self.get_json(&self.comment_url).await
    }

    async fn post_comment(&self, text: &str) -> Result<(), BackendError> {
        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::SameOrigin);
        opts.set_credentials(RequestCredentials::SameOrigin);
        opts.set_body(&comment_form(text)?.into());

        let request = Request::new_with_str_and_init(&self.comment_url, &opts)
            .map_err(|err| network_error("Failed to create comment request", err))?;

        self.send(request).await.map(|_| ())
    }
}

pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|err| BackendError::Decode(err.to_string()))
}

/// Form body for a comment post. `fetch` sends it as
/// `application/x-www-form-urlencoded` on its own.
fn comment_form(text: &str) -> Result<UrlSearchParams, BackendError> {
    let params = UrlSearchParams::new()
        .map_err(|err| network_error("Failed to build comment form", err))?;
    params.append(COMMENT_FIELD, text);
    Ok(params)
}

fn network_error(context: &str, err: JsValue) -> BackendError {
    BackendError::Network(utils::format_js_error(context, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_comment_lists() {
        let comments: Vec<Comment> = decode(
            r#"[{"user":"ada","text":"hi","timestamp":2},{"user":"bob","text":"yo","timestamp":1}]"#,
        )
        .expect("comments should decode");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author, "ada");
        assert_eq!(comments[1].timestamp, 1);
    }

    #[test]
    fn decode_reports_malformed_bodies() {
        let result: Result<AuthStatus, _> = decode("<html>oops</html>");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn backend_errors_describe_themselves() {
        assert_eq!(
            BackendError::Status(503).to_string(),
            "server answered with status 503"
        );
    }
}
