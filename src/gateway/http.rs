// HTTP Gateway Module
// Talks to the social service REST API: sign-up, login, post creation and likes.

use super::{GatewayError, PostId, ServiceGateway, UserId};
use crate::config::ConfigError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    user: Credentials<'a>,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePostRequest<'a> {
    content: &'a str,
}

/// Envelope used by the service for most replies
#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<Value>,
}

impl ApiResponse {
    fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    fn message_text(&self) -> String {
        match &self.message {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => "no message".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access: Option<String>,
}

/// Network-backed [`ServiceGateway`].
///
/// Users are identified by their username; the bearer token obtained at
/// sign-up is kept per user and sent with posts and likes.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    password: String,
    email: String,
    tokens: RwLock<HashMap<UserId, String>>,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        password: &str,
        email: &str,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Validation(format!("HTTP client: {}", e)))?;

        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            password: password.to_string(),
            email: email.to_string(),
            tokens: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self, user: &UserId) -> Option<String> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .cloned()
    }

    async fn sign_up(&self, name: &str) -> Result<(), String> {
        let response = self
            .client
            .post(self.url("user/signup/"))
            .json(&SignupRequest {
                user: Credentials {
                    username: name,
                    password: &self.password,
                },
                email: &self.email,
            })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let body: ApiResponse = response.json().await.unwrap_or_default();
        if !status.is_success() || !body.is_success() {
            return Err(format!("{} ({})", body.message_text(), status));
        }
        Ok(())
    }

    async fn login(&self, name: &str) -> Result<String, String> {
        let response = self
            .client
            .post(self.url("user/login/"))
            .json(&Credentials {
                username: name,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| format!("login: {}", e))?;

        let status = response.status();
        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| format!("login: {} ({})", e, status))?;
        body.access
            .filter(|token| !token.is_empty())
            .ok_or_else(|| format!("login: no access token ({})", status))
    }
}

#[async_trait]
impl ServiceGateway for HttpGateway {
    async fn register(&self, display_name: &str) -> Result<UserId, GatewayError> {
        let failure = |reason: String| GatewayError::Registration {
            name: display_name.to_string(),
            reason,
        };

        self.sign_up(display_name).await.map_err(failure)?;
        let token = self.login(display_name).await.map_err(failure)?;

        let id = UserId(display_name.to_string());
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), token);
        Ok(id)
    }

    async fn publish(&self, user: &UserId, content: &str) -> Result<PostId, GatewayError> {
        let failure = |reason: String| GatewayError::Publish {
            user: user.clone(),
            reason,
        };
        let token = self
            .token(user)
            .ok_or_else(|| failure("user is not logged in".to_string()))?;

        let response = self
            .client
            .post(self.url("post/create/"))
            .bearer_auth(token)
            .json(&CreatePostRequest { content })
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| failure(format!("{} ({})", e, status)))?;
        if !status.is_success() || !body.is_success() {
            return Err(failure(format!("{} ({})", body.message_text(), status)));
        }

        match body.message {
            Some(Value::Number(id)) => Ok(PostId(id.to_string())),
            Some(Value::String(id)) if !id.is_empty() => Ok(PostId(id)),
            _ => Err(failure("response carried no post id".to_string())),
        }
    }

    async fn like(&self, user: &UserId, post: &PostId) -> Result<bool, GatewayError> {
        let failure = |reason: String| GatewayError::Like {
            user: user.clone(),
            post: post.clone(),
            reason,
        };
        let token = self
            .token(user)
            .ok_or_else(|| failure("user is not logged in".to_string()))?;

        let response = self
            .client
            .get(self.url(&format!("post/{}/like", post)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(failure(format!("server error ({})", status)));
        }
        // Auth, throttling and timeout replies say nothing about the like itself
        if matches!(
            status,
            StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::REQUEST_TIMEOUT
                | StatusCode::TOO_MANY_REQUESTS
        ) {
            return Err(failure(format!("request not accepted ({})", status)));
        }

        let body: ApiResponse = match response.json().await {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                return Err(failure(format!("malformed response: {}", e)))
            }
            Err(_) => ApiResponse::default(),
        };

        if status.is_success() && body.is_success() {
            Ok(true)
        } else {
            tracing::debug!(
                user = %user,
                post = %post,
                status = status.as_u16(),
                message = %body.message_text(),
                "Like rejected by service"
            );
            Ok(false)
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let gateway =
            HttpGateway::new("http://localhost:8000/api", "pw", "e@x", Duration::from_secs(1))
                .unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:8000/api/");
        assert_eq!(gateway.url("user/login/"), "http://localhost:8000/api/user/login/");
    }

    #[test]
    fn test_message_text() {
        let body: ApiResponse =
            serde_json::from_str(r#"{"status": "error", "message": "taken"}"#).unwrap();
        assert!(!body.is_success());
        assert_eq!(body.message_text(), "taken");

        let body: ApiResponse =
            serde_json::from_str(r#"{"status": "success", "message": 12}"#).unwrap();
        assert!(body.is_success());
        assert_eq!(body.message_text(), "12");
    }

    #[tokio::test]
    async fn test_publish_without_login_fails() {
        let gateway =
            HttpGateway::new("http://127.0.0.1:9/", "pw", "e@x", Duration::from_millis(100))
                .unwrap();
        let result = gateway
            .publish(&UserId("nobody".to_string()), "content")
            .await;
        assert!(matches!(result, Err(GatewayError::Publish { .. })));
    }
}
