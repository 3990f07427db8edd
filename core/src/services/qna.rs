//! Q&A board. Questions and answers may carry images, so they go up as
//! multipart forms.

use serde_json::json;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::MultipartForm;
use crate::response::ApiResponse;
use crate::transport::Transport;

pub struct QnaService<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> QnaService<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    pub async fn create_question(&self, form: MultipartForm) -> Result<ApiResponse, ApiError> {
        self.client.post_form_data("/qna/create.do", form, true).await
    }

    pub async fn create_answer(&self, form: MultipartForm) -> Result<ApiResponse, ApiError> {
        self.client.post_form_data("/qna/answer/create.do", form, true).await
    }

    pub async fn like_question(&self, question_id: i64) -> Result<ApiResponse, ApiError> {
        self.client
            .post_json("/qna/like.do", &json!({ "questionId": question_id }), true)
            .await
    }
}
