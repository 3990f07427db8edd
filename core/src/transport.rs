//! The I/O boundary: something that can execute an `HttpRequest`.
//!
//! # Design
//! `ApiClient` is generic over `Transport` and never touches sockets itself.
//! `ReqwestTransport` is the production implementation; tests script
//! responses with their own in-process transports.
//!
//! `ReqwestTransport` manages cookies through its own jar instead of the
//! client's automatic store so `include_credentials` can be honored per
//! request.

use std::future::Future;
use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderValue, COOKIE, SET_COOKIE};
use reqwest::Url;
use thiserror::Error;

use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, PartValue, RequestBody};

/// The request never produced a response.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

/// Executes one request. Any status code, including 4xx/5xx, is a response;
/// only failures to obtain one are errors.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport with a cookie jar for the session cookie.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::from_builder(reqwest::Client::builder())
    }

    /// Build from a caller-configured builder (timeouts, proxies, TLS).
    /// The builder's own cookie store is always switched off: the jar here
    /// is the only place session cookies live.
    pub fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self, TransportError> {
        Ok(Self {
            client: builder.cookie_store(false).build()?,
            jar: Arc::new(Jar::default()),
        })
    }

    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.jar
    }
}

fn to_reqwest_form(form: MultipartForm) -> Result<reqwest::multipart::Form, TransportError> {
    let mut out = reqwest::multipart::Form::new();
    for part in form.parts() {
        out = match &part.value {
            PartValue::Text(v) => out.text(part.name.clone(), v.clone()),
            PartValue::File {
                file_name,
                content_type,
                bytes,
            } => {
                let mut file = reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(ct) = content_type {
                    file = file.mime_str(ct)?;
                }
                out.part(part.name.clone(), file)
            }
        };
    }
    Ok(out)
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = Url::parse(&request.url).map_err(|e| TransportError(format!("invalid url {}: {e}", request.url)))?;
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.include_credentials {
            if let Some(cookies) = self.jar.cookies(&url) {
                builder = builder.header(COOKIE, cookies);
            }
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Text(text) => builder.body(text),
            RequestBody::Multipart(form) => builder.multipart(to_reqwest_form(form)?),
        };

        let response = builder.send().await?;
        if request.include_credentials {
            let mut set_cookies = response.headers().get_all(SET_COOKIE).iter();
            self.jar.set_cookies(&mut set_cookies as &mut dyn Iterator<Item = &HeaderValue>, &url);
        }

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        let body = response.text().await?;
        Ok(HttpResponse { status, headers, body })
    }
}
