//! Request options resolution.
//!
//! # Responsibilities
//! - Extract query, variables and operation name from the URL query string
//! - Fall back to the POST body (`application/graphql`, form, JSON)
//! - Degrade to an empty request on malformed input instead of failing
//!
//! # Design Decisions
//! - Query string wins over the body for every method
//! - Non-POST requests never read the body
//! - JSON bodies are decoded field by field when the strict shape fails, so a
//!   `variables` value sent as an encoded string is still accepted

use std::borrow::Cow;

use axum::http::{header, request::Parts, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::form_urlencoded;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_GRAPHQL: &str = "application/graphql";
pub const CONTENT_TYPE_FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";

/// Canonical request handed to the execution engine.
///
/// `variables` is `None` when the client sent none at all. Query-string and
/// form requests always carry `Some`, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub query: String,
    pub variables: Option<Map<String, Value>>,
    pub operation_name: String,
}

/// Strict shape of a JSON request body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct JsonRequestOptions {
    query: String,
    variables: Option<Map<String, Value>>,
    operation_name: String,
}

impl From<JsonRequestOptions> for ExecutionRequest {
    fn from(opts: JsonRequestOptions) -> Self {
        Self {
            query: opts.query,
            variables: opts.variables,
            operation_name: opts.operation_name,
        }
    }
}

impl ExecutionRequest {
    /// Build the execution request for one inbound HTTP request.
    pub fn resolve(parts: &Parts, body: &[u8]) -> Self {
        if let Some(opts) = parts.uri.query().and_then(|q| Self::from_form(q.as_bytes())) {
            return opts;
        }

        if parts.method != Method::POST || body.is_empty() {
            return Self::default();
        }

        let content_type = content_type(parts);
        if content_type.eq_ignore_ascii_case(CONTENT_TYPE_GRAPHQL) {
            Self {
                query: String::from_utf8_lossy(body).into_owned(),
                ..Self::default()
            }
        } else if content_type.eq_ignore_ascii_case(CONTENT_TYPE_FORM_URL_ENCODED) {
            Self::from_form(body).unwrap_or_default()
        } else {
            // application/json and anything unrecognised
            Self::from_json(body)
        }
    }

    /// Extract options from `application/x-www-form-urlencoded` pairs.
    ///
    /// Returns `None` unless a non-empty `query` is present.
    fn from_form(input: &[u8]) -> Option<Self> {
        let mut query: Option<Cow<'_, str>> = None;
        let mut variables: Option<Cow<'_, str>> = None;
        let mut operation_name: Option<Cow<'_, str>> = None;

        for (key, value) in form_urlencoded::parse(input) {
            let slot = match &*key {
                "query" => &mut query,
                "variables" => &mut variables,
                "operationName" => &mut operation_name,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        let query = query.filter(|q| !q.is_empty())?;
        let variables = variables
            .and_then(|raw| serde_json::from_str::<Map<String, Value>>(&raw).ok())
            .unwrap_or_default();

        Some(Self {
            query: query.into_owned(),
            variables: Some(variables),
            operation_name: operation_name.map(Cow::into_owned).unwrap_or_default(),
        })
    }

    fn from_json(body: &[u8]) -> Self {
        match serde_json::from_slice::<JsonRequestOptions>(body) {
            Ok(opts) => opts.into(),
            Err(err) => {
                tracing::debug!(error = %err, "JSON body does not match the request shape, decoding field by field");
                Self::from_json_lenient(body)
            }
        }
    }

    /// Keep every field that decodes and re-read a string `variables` as JSON.
    fn from_json_lenient(body: &[u8]) -> Self {
        let Ok(mut fields) = serde_json::from_slice::<Map<String, Value>>(body) else {
            return Self::default();
        };

        let mut text = |key: &str| match fields.remove(key) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        let query = text("query");
        let operation_name = text("operationName");

        let variables = match fields.remove("variables") {
            Some(Value::Object(map)) => Some(map),
            Some(Value::String(encoded)) => {
                serde_json::from_str::<Option<Map<String, Value>>>(&encoded)
                    .ok()
                    .flatten()
            }
            _ => None,
        };

        Self {
            query,
            variables,
            operation_name,
        }
    }
}

/// Media type of the request body, parameters stripped.
fn content_type(parts: &Parts) -> &str {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .unwrap_or_default()
}
