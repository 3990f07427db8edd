//! Keyboard catalog: listings, search, tags and scores.

use serde_json::json;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::params::Params;
use crate::response::ApiResponse;
use crate::transport::Transport;

pub const DEFAULT_POPULAR_LIMIT: u32 = 10;
pub const DEFAULT_RELATED_LIMIT: u32 = 5;

pub struct KeyboardService<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> KeyboardService<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    pub async fn get_keyboards(&self, params: &Params) -> Result<ApiResponse, ApiError> {
        self.client.get("/keyboard/list.do", params, false).await
    }

    pub async fn get_keyboard_details(&self, keyboard_id: i64) -> Result<ApiResponse, ApiError> {
        let params = Params::new().with("id", keyboard_id);
        self.client.get("/keyboard/detail.do", &params, false).await
    }

    /// Search the catalog. Later parameter groups override earlier ones on
    /// key collisions: filters, then sorting, then pagination.
    pub async fn search_keyboards(
        &self,
        query: &str,
        filters: &Params,
        sorting: &Params,
        pagination: &Params,
    ) -> Result<ApiResponse, ApiError> {
        let mut params = Params::new().with("query", query);
        params.merge(filters);
        params.merge(sorting);
        params.merge(pagination);
        self.client.get("/keyboard/search.do", &params, false).await
    }

    pub async fn get_popular_keyboards(&self, limit: Option<u32>) -> Result<ApiResponse, ApiError> {
        let params = Params::new().with("limit", limit.unwrap_or(DEFAULT_POPULAR_LIMIT));
        self.client.get("/keyboard/popular.do", &params, false).await
    }

    pub async fn suggest_tag(&self, keyboard_id: i64, tag_name: &str, reason: &str) -> Result<ApiResponse, ApiError> {
        let body = json!({
            "action": "suggestTag",
            "keyboardId": keyboard_id,
            "tagName": tag_name,
            "reason": reason,
        });
        self.client.post_json("/keyboard.do", &body, true).await
    }

    pub async fn vote_tag(&self, keyboard_id: i64, tag_id: i64, vote_type: &str) -> Result<ApiResponse, ApiError> {
        let body = json!({
            "action": "voteTag",
            "keyboardId": keyboard_id,
            "tagId": tag_id,
            "voteType": vote_type,
        });
        self.client.post_json("/keyboard.do", &body, true).await
    }

    pub async fn rate_keyboard(&self, keyboard_id: i64, score_value: u8, review: &str) -> Result<ApiResponse, ApiError> {
        let body = json!({
            "action": "addScore",
            "keyboardId": keyboard_id,
            "scoreValue": score_value,
            "review": review,
        });
        self.client.post_json("/keyboard.do", &body, true).await
    }

    pub async fn get_related_keyboards(&self, keyboard_id: i64, limit: Option<u32>) -> Result<ApiResponse, ApiError> {
        let params = Params::new()
            .with("id", keyboard_id)
            .with("limit", limit.unwrap_or(DEFAULT_RELATED_LIMIT));
        self.client.get("/keyboard/related.do", &params, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{authed_client_with, client_with, ScriptedTransport};

    #[tokio::test]
    async fn search_merges_parameter_groups() {
        let client = client_with(ScriptedTransport::default().reply(200, "application/json", "[]"));
        client
            .keyboards()
            .search_keyboards(
                "tkl",
                &Params::new().with("switch", "linear").with("page", 9),
                &Params::new().with("sort", "rating"),
                &Params::new().with("page", 2).with("size", 20),
            )
            .await
            .unwrap();
        assert_eq!(
            client.transport().last().url,
            "http://kirini.test/keyboard/search.do?query=tkl&switch=linear&page=2&sort=rating&size=20"
        );
    }

    #[tokio::test]
    async fn limits_default_when_omitted() {
        let client = client_with(
            ScriptedTransport::default()
                .reply(200, "application/json", "[]")
                .reply(200, "application/json", "[]"),
        );
        client.keyboards().get_popular_keyboards(None).await.unwrap();
        assert_eq!(client.transport().last().url, "http://kirini.test/keyboard/popular.do?limit=10");
        client.keyboards().get_related_keyboards(3, None).await.unwrap();
        assert_eq!(client.transport().last().url, "http://kirini.test/keyboard/related.do?id=3&limit=5");
    }

    #[tokio::test]
    async fn tag_actions_are_authenticated_json_posts() {
        let client = authed_client_with(ScriptedTransport::default());
        let echoed = client.keyboards().vote_tag(1, 2, "up").await.unwrap();
        let req = client.transport().last();
        assert_eq!(req.url, "http://kirini.test/keyboard.do");
        assert_eq!(req.header("Authorization"), Some("Bearer tok-123"));
        assert_eq!(
            echoed.into_json(),
            Some(json!({"action": "voteTag", "keyboardId": 1, "tagId": 2, "voteType": "up"}))
        );
    }

    #[tokio::test]
    async fn rate_keyboard_sends_score() {
        let client = authed_client_with(ScriptedTransport::default());
        let echoed = client.keyboards().rate_keyboard(7, 4, "").await.unwrap();
        let body = echoed.into_json().unwrap();
        assert_eq!(body["action"], "addScore");
        assert_eq!(body["scoreValue"], 4);
    }
}
