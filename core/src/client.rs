//! The request core and its convenience verbs.
//!
//! # Design
//! `ApiClient` holds its configuration, the injected `TokenStore` and a
//! `Transport`. It keeps no per-call state: every call assembles a fresh
//! `HttpRequest` in `build_request`, hands it to the transport, and
//! normalizes the outcome with `parse_response`. The split mirrors the
//! I/O boundary, so request assembly can be tested without a server.
//!
//! The token is read once while the request is assembled; nothing in the
//! request path writes it.

use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{set_header, HttpMethod, HttpRequest, MultipartForm, RequestBody};
use crate::params::Params;
use crate::response::{parse_response, ApiResponse};
use crate::services::{
    BoardService, GlossaryService, KeyboardService, MypageService, QnaService, ReviewService, UserService,
};
use crate::token::TokenStore;
use crate::transport::Transport;

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

/// Routes that are expected to be called before a token exists.
const ANONYMOUS_AUTH_ROUTES: &[&str] = &["/login", "/join", "/auth/check-id", "/auth/check-nickname"];

/// Caller-supplied part of a request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        set_header(&mut self.headers, name, value);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}

/// Client for the Kirini web API.
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    config: ClientConfig,
    tokens: TokenStore,
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(config: ClientConfig, tokens: TokenStore, transport: T) -> Self {
        Self {
            config,
            tokens,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Assemble the request for one call without sending it.
    ///
    /// Caller headers override the configured defaults. With `with_auth`
    /// set and a token stored, `Authorization: Bearer <token>` is added;
    /// without a token the request goes out anonymously.
    pub fn build_request(&self, url: &str, options: RequestOptions, with_auth: bool) -> HttpRequest {
        let mut headers: Vec<(String, String)> = self
            .config
            .default_headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, value) in &options.headers {
            set_header(&mut headers, name, value);
        }

        if with_auth {
            match self.tokens.token() {
                Some(token) => set_header(&mut headers, "Authorization", &format!("Bearer {token}")),
                None if !ANONYMOUS_AUTH_ROUTES.iter().any(|r| url.contains(r)) => {
                    tracing::warn!(url, "auth token is missing for protected route; proceeding without token");
                }
                None => {}
            }
        }

        HttpRequest {
            method: options.method,
            url: self.config.resolve(url),
            headers,
            body: options.body,
            include_credentials: true,
        }
    }

    /// Execute one request and normalize its outcome.
    pub async fn request(&self, url: &str, options: RequestOptions, with_auth: bool) -> Result<ApiResponse, ApiError> {
        let request = self.build_request(url, options, with_auth);
        let method = request.method.as_str();
        let target = request.url.clone();
        tracing::debug!(method, url = %target, "sending request");

        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(method, url = %target, error = %e, "request failed before a response");
                return Err(e.into());
            }
        };
        tracing::debug!(
            method,
            url = %target,
            status = response.status,
            len = response.body.len(),
            "received response"
        );

        parse_response(response).inspect_err(|e| {
            tracing::error!(method, url = %target, status = ?e.status(), error = %e, "request failed");
        })
    }

    // -----------------------------------------------------------------------
    // Convenience verbs
    // -----------------------------------------------------------------------

    /// GET with `params` as the query string.
    pub async fn get(&self, url: &str, params: &Params, with_auth: bool) -> Result<ApiResponse, ApiError> {
        self.request(&params.append_to(url), RequestOptions::new(HttpMethod::Get), with_auth)
            .await
    }

    /// GET that insists on a JSON answer. Callers normally pass
    /// `with_auth = true`: these endpoints mean nothing anonymously.
    pub async fn get_json(&self, url: &str, params: &Params, with_auth: bool) -> Result<ApiResponse, ApiError> {
        let options = RequestOptions::new(HttpMethod::Get).header("Accept", "application/json");
        self.request(&params.append_to(url), options, with_auth).await
    }

    /// POST `data` as a form-urlencoded body.
    pub async fn post(&self, url: &str, data: &Params, with_auth: bool) -> Result<ApiResponse, ApiError> {
        let options = RequestOptions::new(HttpMethod::Post)
            .header("Content-Type", FORM_CONTENT_TYPE)
            .body(RequestBody::Text(data.encode()));
        self.request(url, options, with_auth).await
    }

    /// POST `data` as JSON.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &B,
        with_auth: bool,
    ) -> Result<ApiResponse, ApiError> {
        let options = json_options(HttpMethod::Post, data)?;
        self.request(url, options, with_auth).await
    }

    /// POST a multipart form. The transport sets the content type so it can
    /// choose the boundary.
    pub async fn post_form_data(
        &self,
        url: &str,
        form: MultipartForm,
        with_auth: bool,
    ) -> Result<ApiResponse, ApiError> {
        let options = RequestOptions::new(HttpMethod::Post).body(RequestBody::Multipart(form));
        self.request(url, options, with_auth).await
    }

    /// PUT `data` as JSON.
    pub async fn put_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &B,
        with_auth: bool,
    ) -> Result<ApiResponse, ApiError> {
        let options = json_options(HttpMethod::Put, data)?;
        self.request(url, options, with_auth).await
    }

    /// DELETE, with a JSON body only when `data` is given.
    pub async fn delete(&self, url: &str, data: Option<&Value>, with_auth: bool) -> Result<ApiResponse, ApiError> {
        let options = match data {
            Some(body) => json_options(HttpMethod::Delete, body)?,
            None => RequestOptions::new(HttpMethod::Delete),
        };
        self.request(url, options, with_auth).await
    }

    // -----------------------------------------------------------------------
    // Resource services
    // -----------------------------------------------------------------------

    pub fn users(&self) -> UserService<'_, T> {
        UserService::new(self)
    }

    pub fn keyboards(&self) -> KeyboardService<'_, T> {
        KeyboardService::new(self)
    }

    pub fn boards(&self) -> BoardService<'_, T> {
        BoardService::new(self)
    }

    pub fn glossary(&self) -> GlossaryService<'_, T> {
        GlossaryService::new(self)
    }

    pub fn reviews(&self) -> ReviewService<'_, T> {
        ReviewService::new(self)
    }

    pub fn qna(&self) -> QnaService<'_, T> {
        QnaService::new(self)
    }

    pub fn mypage(&self) -> MypageService<'_, T> {
        MypageService::new(self)
    }
}

fn json_options<B: Serialize + ?Sized>(method: HttpMethod, data: &B) -> Result<RequestOptions, ApiError> {
    let body = serde_json::to_string(data).map_err(|e| ApiError::Serialization(e.to_string()))?;
    Ok(RequestOptions::new(method)
        .header("Content-Type", JSON_CONTENT_TYPE)
        .body(RequestBody::Text(body)))
}
