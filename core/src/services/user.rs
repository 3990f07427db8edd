//! Accounts: login/logout, signup checks, profile and password.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::params::Params;
use crate::response::ApiResponse;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub user_level: Option<i32>,
    pub user_authority: Option<String>,
}

/// Answer of `/login.do`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: Option<String>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub redirect: Option<String>,
    pub user: Option<UserSummary>,
}

/// Answer of the signup duplicate checks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheck {
    pub is_available: bool,
    pub is_duplicate: bool,
    pub message: Option<String>,
}

pub struct UserService<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> UserService<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// Log in. On success any token the server issued is stored in the
    /// client's token store; the session cookie travels regardless.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = json!({ "email": email, "password": password });
        let result: LoginResponse = self.client.post_json("/login.do", &body, false).await?.decode()?;
        if result.success {
            let tokens = self.client.tokens();
            if let Some(token) = result.token.as_deref() {
                tokens.set_token(Some(token))?;
            }
            if let Some(refresh) = result.refresh_token.as_deref() {
                tokens.set_refresh_token(Some(refresh))?;
            }
        }
        Ok(result)
    }

    /// Register from a signup form. Absent fields are not sent.
    pub async fn register(&self, user_data: &Params) -> Result<ApiResponse, ApiError> {
        self.client.post("/register.do", user_data, false).await
    }

    pub async fn check_email_duplicate(&self, email: &str) -> Result<DuplicateCheck, ApiError> {
        let params = Params::new().with("action", "checkEmail").with("email", email);
        self.client.get("/signup.do", &params, false).await?.decode()
    }

    pub async fn check_nickname_duplicate(&self, nickname: &str) -> Result<DuplicateCheck, ApiError> {
        let params = Params::new().with("action", "checkNickname").with("nickname", nickname);
        self.client.get("/signup.do", &params, false).await?.decode()
    }

    /// Profile of `user_id`, or of the logged-in user when `None`.
    pub async fn get_profile(&self, user_id: Option<i64>) -> Result<ApiResponse, ApiError> {
        let params = Params::new().with_opt("userId", user_id);
        self.client.get("/profile.do", &params, true).await
    }

    pub async fn update_profile(&self, profile: &Value) -> Result<ApiResponse, ApiError> {
        self.client.put_json("/profile.do", profile, true).await
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<ApiResponse, ApiError> {
        let body = json!({ "currentPassword": current_password, "newPassword": new_password });
        self.client.post_json("/password.do", &body, false).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<ApiResponse, ApiError> {
        self.client
            .post_json("/forgot-password.do", &json!({ "email": email }), false)
            .await
    }

    /// Drop local tokens, then tell the server. The server call is best
    /// effort: its failure is logged, not returned.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.client.tokens().clear_all()?;
        if let Err(e) = self.client.get("/logout.do", &Params::new(), false).await {
            tracing::warn!(error = %e, "logout request failed; local tokens already cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{authed_client_with, client_with, ScriptedTransport};
    use crate::http::HttpMethod;

    #[tokio::test]
    async fn login_stores_issued_tokens() {
        let client = client_with(ScriptedTransport::default().reply(
            200,
            "application/json",
            r#"{"success":true,"message":"ok","token":"jwt-1","refreshToken":"r-1","user":{"userId":4,"nickname":"kim","userAuthority":"USER"}}"#,
        ));
        let result = client.users().login("kim@kirini.test", "pw").await.unwrap();
        assert!(result.success);
        assert_eq!(result.user.unwrap().nickname.as_deref(), Some("kim"));
        assert_eq!(client.tokens().token().as_deref(), Some("jwt-1"));
        assert_eq!(client.tokens().refresh_token().as_deref(), Some("r-1"));

        let req = client.transport().last();
        assert_eq!(req.url, "http://kirini.test/login.do");
        assert!(req.header("Authorization").is_none());
    }

    #[tokio::test]
    async fn failed_login_stores_nothing() {
        let client = client_with(ScriptedTransport::default().reply(
            200,
            "application/json",
            r#"{"success":false,"message":"Wrong password","token":"ignored"}"#,
        ));
        let result = client.users().login("kim@kirini.test", "bad").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("Wrong password"));
        assert!(client.tokens().token().is_none());
    }

    #[tokio::test]
    async fn login_with_unexpected_shape_is_decode_error() {
        let client = client_with(ScriptedTransport::default().reply(200, "text/html", "<html>login</html>"));
        let err = client.users().login("a", "b").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn duplicate_checks_decode_schema() {
        let client = client_with(
            ScriptedTransport::default()
                .reply(200, "application/json", r#"{"isAvailable":false,"isDuplicate":true,"message":"taken"}"#)
                .reply(200, "application/json", r#"{"isAvailable":true,"isDuplicate":false}"#),
        );
        let email = client.users().check_email_duplicate("a b@kirini.test").await.unwrap();
        assert!(email.is_duplicate);
        assert_eq!(
            client.transport().last().url,
            "http://kirini.test/signup.do?action=checkEmail&email=a+b%40kirini.test"
        );

        let nick = client.users().check_nickname_duplicate("kim").await.unwrap();
        assert!(nick.is_available);
        assert!(nick.message.is_none());
    }

    #[tokio::test]
    async fn get_profile_is_authenticated() {
        let client = authed_client_with(
            ScriptedTransport::default()
                .reply(200, "application/json", "{}")
                .reply(200, "application/json", "{}"),
        );
        client.users().get_profile(None).await.unwrap();
        let own = client.transport().last();
        assert_eq!(own.url, "http://kirini.test/profile.do");
        assert_eq!(own.header("Authorization"), Some("Bearer tok-123"));

        client.users().get_profile(Some(42)).await.unwrap();
        assert_eq!(client.transport().last().url, "http://kirini.test/profile.do?userId=42");
    }

    #[tokio::test]
    async fn register_posts_form() {
        let client = client_with(ScriptedTransport::default().reply(200, "application/json", r#"{"success":true}"#));
        let form = Params::new().with("email", "kim@kirini.test").with("nickname", "kim");
        client.users().register(&form).await.unwrap();
        let req = client.transport().last();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body.as_text(), Some("email=kim%40kirini.test&nickname=kim"));
    }

    #[tokio::test]
    async fn change_password_payload() {
        let client = client_with(ScriptedTransport::default());
        let echoed = client.users().change_password("old", "new").await.unwrap();
        assert_eq!(echoed.into_json(), Some(json!({"currentPassword": "old", "newPassword": "new"})));
    }

    #[tokio::test]
    async fn logout_clears_tokens_even_when_server_fails() {
        let client = authed_client_with(ScriptedTransport::default().fail("connection reset"));
        client.tokens().set_refresh_token(Some("r")).unwrap();
        client.users().logout().await.unwrap();
        assert!(client.tokens().token().is_none());
        assert!(client.tokens().refresh_token().is_none());

        let req = client.transport().last();
        assert_eq!(req.url, "http://kirini.test/logout.do");
        assert!(req.header("Authorization").is_none());
    }
}
