//! GraphQL-over-HTTP handler library.
//!
//! Resolves GraphQL requests from query strings, form bodies, JSON bodies and
//! raw `application/graphql` bodies, runs them through a pluggable
//! [`ExecutionEngine`], and answers with JSON, a GraphiQL / Playground page or
//! a static asset depending on the client.

pub mod config;
pub mod graphql;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use graphql::{
    ExecutionEngine, ExecutionParams, ExecutionRequest, ExecutionResult, FormattedError,
    GraphQLHandler, HandlerError, HandlerOptions, RequestContext,
};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
