//! Execution engine seam.
//!
//! The handler never parses or validates GraphQL itself. It hands the
//! resolved request to an [`ExecutionEngine`] and waits for the result.

use std::future::Future;
use std::sync::Arc;

use axum::http::{request::Parts, HeaderMap, Method, Uri};
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::graphql::request::ExecutionRequest;
use crate::graphql::response::ExecutionResult;

/// Read-only view of the inbound HTTP request, shared with the engine and
/// every callback for the lifetime of one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts) -> Self {
        let request_id = parts
            .headers
            .get(crate::http::X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            request_id,
        }
    }
}

/// Everything the engine needs to run one operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionParams {
    #[serde(flatten)]
    pub request: ExecutionRequest,
    #[serde(skip)]
    pub context: Arc<RequestContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_object: Option<Map<String, Value>>,
}

/// Executes GraphQL operations.
///
/// Implementations must tolerate an empty query: the handler executes
/// before content negotiation, so a plain UI page load still runs once.
pub trait ExecutionEngine: Send + Sync {
    fn execute(&self, params: ExecutionParams) -> BoxFuture<'_, ExecutionResult>;
}

impl<F, Fut> ExecutionEngine for F
where
    F: Fn(ExecutionParams) -> Fut + Send + Sync,
    Fut: Future<Output = ExecutionResult> + Send + 'static,
{
    fn execute(&self, params: ExecutionParams) -> BoxFuture<'_, ExecutionResult> {
        Box::pin(self(params))
    }
}

#[cfg(feature = "async-graphql")]
mod async_graphql_engine {
    use super::*;
    use crate::graphql::response::{FormattedError, Location, PathSegment};

    /// Root object produced by the handler's root object function, made
    /// available to resolvers as request data.
    #[derive(Debug, Clone)]
    pub struct RootObject(pub Map<String, Value>);

    impl<Q, M, S> ExecutionEngine for async_graphql::Schema<Q, M, S>
    where
        Q: async_graphql::ObjectType + 'static,
        M: async_graphql::ObjectType + 'static,
        S: async_graphql::SubscriptionType + 'static,
    {
        fn execute(&self, params: ExecutionParams) -> BoxFuture<'_, ExecutionResult> {
            Box::pin(async move {
                let ExecutionParams {
                    request,
                    context,
                    root_object,
                } = params;

                let mut gql_request = async_graphql::Request::new(request.query)
                    .data(context);
                if let Some(variables) = request.variables {
                    gql_request = gql_request
                        .variables(async_graphql::Variables::from_json(Value::Object(variables)));
                }
                if !request.operation_name.is_empty() {
                    gql_request = gql_request.operation_name(request.operation_name);
                }
                if let Some(root) = root_object {
                    gql_request = gql_request.data(RootObject(root));
                }

                let response = async_graphql::Schema::execute(self, gql_request).await;
                let data = match response.data.into_json() {
                    Ok(Value::Null) => None,
                    Ok(data) => Some(data),
                    Err(err) => {
                        tracing::error!(error = %err, "Failed to convert engine data to JSON");
                        None
                    }
                };
                let errors = response.errors.into_iter().map(into_formatted).collect();

                ExecutionResult {
                    data,
                    errors,
                    extensions: None,
                }
            })
        }
    }

    fn into_formatted(err: async_graphql::ServerError) -> FormattedError {
        let locations = err
            .locations
            .iter()
            .map(|pos| Location {
                line: pos.line,
                column: pos.column,
            })
            .collect();
        let path = err
            .path
            .into_iter()
            .map(|segment| match segment {
                async_graphql::PathSegment::Field(name) => PathSegment::Field(name),
                async_graphql::PathSegment::Index(index) => PathSegment::Index(index),
            })
            .collect();

        FormattedError {
            message: err.message,
            locations,
            path,
            extensions: None,
        }
    }
}

#[cfg(feature = "async-graphql")]
pub use async_graphql_engine::RootObject;
