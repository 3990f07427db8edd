//! Keyboard glossary lookups. All anonymous.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::params::Params;
use crate::response::ApiResponse;
use crate::transport::Transport;

pub struct GlossaryService<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> GlossaryService<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    pub async fn get_terms(&self, params: &Params) -> Result<ApiResponse, ApiError> {
        self.client.get("/glossary/list.do", params, false).await
    }

    pub async fn get_term(&self, term_id: i64) -> Result<ApiResponse, ApiError> {
        self.client
            .get("/glossary/detail.do", &Params::new().with("id", term_id), false)
            .await
    }

    pub async fn search_terms(&self, query: &str, filters: &Params) -> Result<ApiResponse, ApiError> {
        let mut params = Params::new().with("query", query);
        params.merge(filters);
        self.client.get("/glossary/search.do", &params, false).await
    }

    pub async fn get_categories(&self) -> Result<ApiResponse, ApiError> {
        self.client.get("/glossary/categories.do", &Params::new(), false).await
    }
}
