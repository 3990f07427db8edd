//! Ordered key/value parameters for query strings and form bodies.

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// Insertion-ordered parameters. Inserting an existing key replaces its
/// value in place, so merging behaves like an object spread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Like `with`, but `None` leaves the key out entirely.
    pub fn with_opt<V: ToString>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.insert(key, v);
        }
        self
    }

    pub fn insert(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    /// Copy every entry of `other` over `self`.
    pub fn merge(&mut self, other: &Params) {
        for (k, v) in &other.0 {
            self.insert(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten a serializable struct or map into parameters.
    ///
    /// Top-level `null` fields (including `None` options) are dropped.
    /// Strings are used verbatim; arrays and objects are sent as JSON text.
    pub fn from_serialize<S: Serialize + ?Sized>(data: &S) -> Result<Self, ApiError> {
        let value = serde_json::to_value(data).map_err(|e| ApiError::Serialization(e.to_string()))?;
        match value {
            Value::Object(map) => {
                let mut params = Self::new();
                for (key, v) in map {
                    match v {
                        Value::Null => {}
                        Value::String(s) => params.insert(&key, s),
                        other => params.insert(&key, other),
                    }
                }
                Ok(params)
            }
            Value::Null => Ok(Self::new()),
            other => Err(ApiError::Serialization(format!(
                "parameters must be an object, got {other}"
            ))),
        }
    }

    /// `application/x-www-form-urlencoded` encoding, also used for queries.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Append the encoded parameters to `url` as its query string.
    pub fn append_to(&self, url: &str) -> String {
        if self.is_empty() {
            return url.to_string();
        }
        let sep = if url.contains('?') { '&' } else { '?' };
        format!("{url}{sep}{}", self.encode())
    }
}
