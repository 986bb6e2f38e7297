//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use graphql_http_handler::config::ServerConfig;
use graphql_http_handler::graphql::{
    ExecutionEngine, ExecutionParams, ExecutionResult, FormattedError, GraphQLHandler,
    HandlerOptions, Location, PathSegment,
};
use graphql_http_handler::http::HttpServer;
use graphql_http_handler::lifecycle::Shutdown;

/// A running server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// Trigger shutdown and wait for the server loop to return.
    #[allow(dead_code)]
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
            .expect("server returned an error");
    }
}

/// Canned engine answering a tiny slice of the Star Wars schema.
///
/// - `hero` → R2-D2
/// - `rebels` → the Alliance
/// - `echo` → the request as the engine saw it
/// - `broken` → a located field error
/// - empty query → "Must provide an operation."
pub fn star_wars_engine() -> impl ExecutionEngine + 'static {
    |params: ExecutionParams| async move { answer(&params) }
}

fn answer(params: &ExecutionParams) -> ExecutionResult {
    let query = params.request.query.as_str();
    if query.trim().is_empty() {
        return failure(FormattedError::new("Must provide an operation."));
    }
    if query.contains("echo") {
        return success(json!({
            "echo": {
                "query": params.request.query,
                "variables": params.request.variables,
                "operationName": params.request.operation_name,
                "root": params.root_object,
            }
        }));
    }
    if query.contains("broken") {
        return ExecutionResult {
            data: Some(json!({ "broken": null })),
            errors: vec![FormattedError {
                message: "resolver exploded".into(),
                locations: vec![Location { line: 1, column: 3 }],
                path: vec![PathSegment::Field("broken".into())],
                extensions: None,
            }],
            extensions: None,
        };
    }
    if query.contains("rebels") {
        return success(json!({
            "rebels": { "id": "RmFjdGlvbjox", "name": "Alliance to Restore the Republic" }
        }));
    }
    if query.contains("hero") {
        return success(json!({ "hero": { "name": "R2-D2" } }));
    }
    failure(FormattedError::new("Cannot query field on type \"Query\"."))
}

fn success(data: Value) -> ExecutionResult {
    ExecutionResult {
        data: Some(data),
        ..ExecutionResult::default()
    }
}

fn failure(error: FormattedError) -> ExecutionResult {
    ExecutionResult {
        data: None,
        errors: vec![error],
        extensions: None,
    }
}

/// Start a server with the canned engine and the given options.
pub async fn spawn_server(options: HandlerOptions) -> TestServer {
    let handler = GraphQLHandler::new(options.with_engine(star_wars_engine())).unwrap();
    spawn_handler(handler, ServerConfig::default()).await
}

pub async fn spawn_handler(handler: GraphQLHandler, config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, handler);
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    TestServer {
        addr,
        shutdown,
        task,
    }
}
