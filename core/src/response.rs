//! Response normalization: content negotiation and error extraction.
//!
//! # Design
//! `parse_response` is a pure function from `HttpResponse` to either an
//! `ApiResponse` or an `ApiError`. The `content-type` header alone picks the
//! decoding path, so a single response never yields both JSON and text.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// Maximum characters of a raw error body kept in `details`.
const ERROR_DETAIL_LIMIT: usize = 500;

/// Maximum characters of a malformed body quoted in a decode error.
const DECODE_SNIPPET_LIMIT: usize = 100;

/// Decoded body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(Value),
    Text(String),
    /// 204, or a JSON response with an empty body.
    NoContent,
}

impl ApiResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResponse::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ApiResponse::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ApiResponse::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_no_content(&self) -> bool {
        matches!(self, ApiResponse::NoContent)
    }

    /// Decode into a fixed schema. `NoContent` decodes as JSON `null`, so
    /// `Option<T>` accepts it; a text body is always a decode error.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            ApiResponse::Json(v) => v,
            ApiResponse::NoContent => Value::Null,
            ApiResponse::Text(raw) => {
                return Err(ApiError::Decode {
                    message: format!("Expected a JSON response, got text: {}", snippet(&raw, DECODE_SNIPPET_LIMIT)),
                    raw_body: raw,
                })
            }
        };
        serde_json::from_value::<T>(value.clone()).map_err(|e| ApiError::Decode {
            message: format!("Response did not match the expected schema: {e}"),
            raw_body: value.to_string(),
        })
    }

    /// Decode the value stored under `field` of a JSON object response.
    /// A missing field is an error, never a silent default.
    pub fn decode_field<T: DeserializeOwned>(self, field: &str) -> Result<T, ApiError> {
        let raw = match &self {
            ApiResponse::Json(v) => v.to_string(),
            ApiResponse::Text(t) => t.clone(),
            ApiResponse::NoContent => String::new(),
        };
        let mut object = match self {
            ApiResponse::Json(Value::Object(map)) => map,
            _ => {
                return Err(ApiError::Decode {
                    message: format!("Expected a JSON object with field `{field}`"),
                    raw_body: raw,
                })
            }
        };
        let value = object.remove(field).ok_or_else(|| ApiError::Decode {
            message: format!("Response is missing field `{field}`"),
            raw_body: raw.clone(),
        })?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            message: format!("Field `{field}` did not match the expected schema: {e}"),
            raw_body: raw,
        })
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
}

/// First `limit` characters of `text`, with `...` when truncated.
fn snippet(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Build the `Http` error for a non-2xx response.
fn http_error(response: HttpResponse) -> ApiError {
    let status = response.status;
    let mut data = serde_json::json!({
        "message": format!("Server returned {status}"),
        "details": snippet(&response.body, ERROR_DETAIL_LIMIT),
    });
    if is_json(response.content_type()) && !response.body.trim().is_empty() {
        match serde_json::from_str::<Value>(&response.body) {
            Ok(parsed) => data = parsed,
            Err(e) => tracing::warn!(status, error = %e, "error body is not valid JSON; keeping raw text"),
        }
    }
    let message = data
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP error {status}"));
    ApiError::Http {
        status,
        message,
        data,
        raw_body: response.body,
    }
}

/// Normalize a transport response into exactly one of `ApiResponse` or
/// `ApiError`.
pub fn parse_response(response: HttpResponse) -> Result<ApiResponse, ApiError> {
    if !response.is_success() {
        return Err(http_error(response));
    }
    if response.status == 204 {
        return Ok(ApiResponse::NoContent);
    }
    if !is_json(response.content_type()) {
        return Ok(ApiResponse::Text(response.body));
    }
    if response.body.trim().is_empty() {
        return Ok(ApiResponse::NoContent);
    }
    serde_json::from_str(&response.body)
        .map(ApiResponse::Json)
        .map_err(|e| ApiError::Decode {
            message: format!(
                "Failed to parse JSON response: {e}. Raw text (start): {}...",
                response.body.chars().take(DECODE_SNIPPET_LIMIT).collect::<String>()
            ),
            raw_body: response.body,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn response(status: u16, content_type: Option<&str>, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: content_type
                .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
                .unwrap_or_default(),
            body: body.to_string(),
        }
    }

    #[test]
    fn json_success_is_decoded() {
        let parsed = parse_response(response(200, Some("application/json;charset=UTF-8"), r#"{"userName":"kim"}"#)).unwrap();
        assert_eq!(parsed, ApiResponse::Json(json!({"userName": "kim"})));
    }

    #[test]
    fn empty_json_body_is_no_content() {
        let parsed = parse_response(response(200, Some("application/json"), "  ")).unwrap();
        assert!(parsed.is_no_content());
    }

    #[test]
    fn status_204_is_no_content() {
        assert!(parse_response(response(204, Some("application/json"), "")).unwrap().is_no_content());
        assert!(parse_response(response(204, None, "")).unwrap().is_no_content());
    }

    #[test]
    fn non_json_success_is_text() {
        let parsed = parse_response(response(200, Some("text/html"), "<p>ok</p>")).unwrap();
        assert_eq!(parsed.as_text(), Some("<p>ok</p>"));
        let parsed = parse_response(response(200, None, "plain")).unwrap();
        assert_eq!(parsed, ApiResponse::Text("plain".to_string()));
    }

    #[test]
    fn content_type_match_ignores_case() {
        let parsed = parse_response(response(200, Some("Application/JSON"), "[1,2]")).unwrap();
        assert_eq!(parsed, ApiResponse::Json(json!([1, 2])));
    }

    #[test]
    fn malformed_json_success_is_decode_error() {
        let err = parse_response(response(200, Some("application/json"), "{oops")).unwrap_err();
        match err {
            ApiError::Decode { message, raw_body } => {
                assert!(message.starts_with("Failed to parse JSON response:"));
                assert!(message.contains("Raw text (start): {oops..."));
                assert_eq!(raw_body, "{oops");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn json_error_body_supplies_message() {
        let err = parse_response(response(500, Some("application/json"), r#"{"message":"X"}"#)).unwrap_err();
        assert_eq!(err.to_string(), "X");
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.data(), Some(&json!({"message": "X"})));
    }

    #[test]
    fn text_error_body_falls_back_to_generic_message() {
        let err = parse_response(response(500, Some("text/html"), "<h1>Internal Error</h1>")).unwrap_err();
        assert_eq!(err.to_string(), "Server returned 500");
        match err {
            ApiError::Http { data, raw_body, .. } => {
                assert_eq!(data["details"], "<h1>Internal Error</h1>");
                assert_eq!(raw_body, "<h1>Internal Error</h1>");
            }
            other => panic!("expected http error, got {other:?}"),
        }
    }

    #[test]
    fn long_error_details_are_truncated() {
        let body = "x".repeat(ERROR_DETAIL_LIMIT + 20);
        let err = parse_response(response(502, None, &body)).unwrap_err();
        let details = err.data().unwrap()["details"].as_str().unwrap().to_string();
        assert_eq!(details.len(), ERROR_DETAIL_LIMIT + 3);
        assert!(details.ends_with("..."));
    }

    #[test]
    fn unparseable_json_error_keeps_default_data() {
        let err = parse_response(response(400, Some("application/json"), "not json")).unwrap_err();
        assert_eq!(err.to_string(), "Server returned 400");
        assert_eq!(err.data().unwrap()["details"], "not json");
    }

    #[test]
    fn json_error_without_message_uses_status() {
        let err = parse_response(response(403, Some("application/json"), r#"{"success":false}"#)).unwrap_err();
        assert_eq!(err.to_string(), "HTTP error 403");
        assert_eq!(err.data().unwrap()["success"], false);
    }

    #[test]
    fn decode_into_schema() {
        #[derive(Deserialize, Debug, PartialEq)]
        #[serde(rename_all = "camelCase")]
        struct Profile {
            user_name: String,
        }
        let profile: Profile = ApiResponse::Json(json!({"userName": "kim"})).decode().unwrap();
        assert_eq!(profile.user_name, "kim");

        let none: Option<Profile> = ApiResponse::NoContent.decode().unwrap();
        assert!(none.is_none());

        let err = ApiResponse::Text("<html>".to_string()).decode::<Profile>().unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn decode_field_fails_loudly_when_missing() {
        let body = ApiResponse::Json(json!({"newsList": []}));
        let err = body.decode_field::<Vec<Value>>("freeboardList").unwrap_err();
        assert_eq!(err.to_string(), "Response is missing field `freeboardList`");

        let body = ApiResponse::Json(json!({"freeboardList": [{"freeboardUid": 1}]}));
        let posts: Vec<Value> = body.decode_field("freeboardList").unwrap();
        assert_eq!(posts.len(), 1);
    }
}
