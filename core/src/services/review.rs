//! Keyboard reviews.

use serde_json::{json, Map, Value};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::params::Params;
use crate::response::ApiResponse;
use crate::transport::Transport;

pub struct ReviewService<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> ReviewService<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// Post a review. Fields of `review` are sent next to `keyboardId` and
    /// win on conflict.
    pub async fn create_review(&self, keyboard_id: i64, review: Map<String, Value>) -> Result<ApiResponse, ApiError> {
        let mut body = Map::new();
        body.insert("keyboardId".to_string(), json!(keyboard_id));
        body.extend(review);
        self.client.post_json("/review/create.do", &body, true).await
    }

    pub async fn get_reviews(&self, keyboard_id: i64, params: &Params) -> Result<ApiResponse, ApiError> {
        let mut query = Params::new().with("keyboardId", keyboard_id);
        query.merge(params);
        self.client.get("/review/list.do", &query, false).await
    }

    pub async fn rate_review_helpfulness(&self, review_id: i64, helpful: bool) -> Result<ApiResponse, ApiError> {
        let body = json!({ "reviewId": review_id, "helpful": helpful });
        self.client.post_json("/review/helpful.do", &body, true).await
    }
}
