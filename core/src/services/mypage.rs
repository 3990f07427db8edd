//! Mypage dashboard, served by a single `/mypage/api` endpoint that
//! dispatches on its `endpoint` query parameter.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::params::Params;
use crate::response::ApiResponse;
use crate::transport::Transport;

const MYPAGE_API: &str = "/mypage/api";

/// Dashboard tabs with their own data endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MypageTab {
    Profile,
    Scraps,
    Posts,
    Ratings,
    Points,
    Customize,
}

impl MypageTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            MypageTab::Profile => "profile",
            MypageTab::Scraps => "scraps",
            MypageTab::Posts => "posts",
            MypageTab::Ratings => "ratings",
            MypageTab::Points => "points",
            MypageTab::Customize => "customize",
        }
    }
}

/// `{success, message}` answer of the mypage mutations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: Option<String>,
}

pub struct MypageService<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> MypageService<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    fn action_url(action: &str) -> String {
        Params::new().with("endpoint", action).append_to(MYPAGE_API)
    }

    /// Data for one dashboard tab.
    pub async fn load_tab(&self, tab: MypageTab, page: u32) -> Result<ApiResponse, ApiError> {
        let params = Params::new().with("endpoint", tab.as_str()).with("page", page);
        self.client.get_json(MYPAGE_API, &params, true).await
    }

    pub async fn update_profile(&self, profile: &Value) -> Result<ActionResult, ApiError> {
        self.client
            .post_json(&Self::action_url("updateProfile"), profile, true)
            .await?
            .decode()
    }

    pub async fn save_customization(&self, icon_id: &str, theme_id: &str) -> Result<ActionResult, ApiError> {
        let body = json!({ "selectedIconId": icon_id, "selectedThemeId": theme_id });
        self.client
            .post_json(&Self::action_url("saveCustomization"), &body, true)
            .await?
            .decode()
    }

    /// Delete the account. Stored tokens are cleared once the server
    /// confirms.
    pub async fn delete_account(&self, confirm_password: &str) -> Result<ActionResult, ApiError> {
        let body = json!({ "confirmPassword": confirm_password });
        let result: ActionResult = self
            .client
            .post_json(&Self::action_url("deleteAccount"), &body, true)
            .await?
            .decode()?;
        if result.success {
            self.client.tokens().clear_all()?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{authed_client_with, ScriptedTransport};

    #[tokio::test]
    async fn load_tab_requests_json_with_token() {
        let client = authed_client_with(ScriptedTransport::default().reply(
            200,
            "application/json",
            r#"{"posts":[],"totalPages":1}"#,
        ));
        let data = client.mypage().load_tab(MypageTab::Posts, 2).await.unwrap();
        assert!(data.as_json().is_some());

        let req = client.transport().last();
        assert_eq!(req.url, "http://kirini.test/mypage/api?endpoint=posts&page=2");
        assert_eq!(req.header("Accept"), Some("application/json"));
        assert_eq!(req.header("Authorization"), Some("Bearer tok-123"));
    }

    #[tokio::test]
    async fn save_customization_decodes_result() {
        let client = authed_client_with(ScriptedTransport::default().reply(
            200,
            "application/json",
            r#"{"success":false,"message":"Unknown theme"}"#,
        ));
        let result = client.mypage().save_customization("icon-1", "theme-9").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("Unknown theme"));
        assert_eq!(
            client.transport().last().url,
            "http://kirini.test/mypage/api?endpoint=saveCustomization"
        );
    }

    #[tokio::test]
    async fn delete_account_clears_tokens_on_success() {
        let client = authed_client_with(ScriptedTransport::default().reply(200, "application/json", r#"{"success":true}"#));
        let result = client.mypage().delete_account("pw").await.unwrap();
        assert!(result.success);
        assert!(client.tokens().token().is_none());
    }

    #[tokio::test]
    async fn delete_account_keeps_tokens_on_refusal() {
        let client = authed_client_with(ScriptedTransport::default().reply(
            200,
            "application/json",
            r#"{"success":false,"message":"Wrong password"}"#,
        ));
        let result = client.mypage().delete_account("bad").await.unwrap();
        assert!(!result.success);
        assert_eq!(client.tokens().token().as_deref(), Some("tok-123"));
    }
}
