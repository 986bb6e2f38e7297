//! Request dispatcher.
//!
//! # Responsibilities
//! - Run resolve → execute → negotiate → respond once per request
//! - Invoke the injected callbacks (root object, error reshaper, observer)
//! - Map collaborator failures to status codes (404 asset, 500 render)
//!
//! # Design Decisions
//! - A handler cannot be built without an execution engine
//! - Configuration and callbacks are shared read-only via `Arc`
//! - Body read failures degrade to an empty body like any malformed input

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, request::Parts, Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use serde_json::{Map, Value};

use crate::config::GraphQLConfig;
use crate::graphql::assets::{guess_content_type, AssetError, AssetStore, DirAssetStore};
use crate::graphql::engine::{ExecutionEngine, ExecutionParams, RequestContext};
use crate::graphql::negotiate::{static_asset_path, NegotiationContext, ResponseMode, UiFlags, UiKind};
use crate::graphql::request::ExecutionRequest;
use crate::graphql::response::{
    ExecutionResult, FormatErrorFn, FormattedError, ResultFormatter, ResultObserverFn,
};
use crate::graphql::ui::{TemplateRenderer, UiPage, UiRenderer};
use crate::http::response;
use crate::observability::metrics;

/// Produces the root object handed to the engine for one request.
pub type RootObjectFn = Arc<dyn Fn(&RequestContext) -> Map<String, Value> + Send + Sync>;

/// Default request body limit (2 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("undefined GraphQL schema: no execution engine configured")]
    MissingEngine,
}

/// Everything a [`GraphQLHandler`] is built from.
#[derive(Clone)]
pub struct HandlerOptions {
    pub engine: Option<Arc<dyn ExecutionEngine>>,
    pub pretty: bool,
    pub graphiql: bool,
    pub playground: bool,
    pub root_object_fn: Option<RootObjectFn>,
    pub result_observer: Option<ResultObserverFn>,
    pub format_error_fn: Option<FormatErrorFn>,
    pub renderer: Arc<dyn UiRenderer>,
    pub assets: Option<Arc<dyn AssetStore>>,
    pub max_body_size: usize,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            engine: None,
            pretty: true,
            graphiql: true,
            playground: false,
            root_object_fn: None,
            result_observer: None,
            format_error_fn: None,
            renderer: Arc::new(TemplateRenderer),
            assets: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl HandlerOptions {
    /// Options taken from the `[graphql]` config section. The engine still
    /// has to be supplied.
    pub fn from_config(config: &GraphQLConfig, max_body_size: usize) -> Self {
        let assets = config
            .static_dir
            .as_ref()
            .map(|dir| Arc::new(DirAssetStore::new(dir)) as Arc<dyn AssetStore>);

        Self {
            pretty: config.pretty,
            graphiql: config.graphiql,
            playground: config.playground,
            assets,
            max_body_size,
            ..Self::default()
        }
    }

    pub fn with_engine(mut self, engine: impl ExecutionEngine + 'static) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_graphiql(mut self, enabled: bool) -> Self {
        self.graphiql = enabled;
        self
    }

    pub fn with_playground(mut self, enabled: bool) -> Self {
        self.playground = enabled;
        self
    }

    pub fn with_root_object_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.root_object_fn = Some(Arc::new(f));
        self
    }

    pub fn with_result_observer<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, &ExecutionParams, &ExecutionResult, &[u8]) + Send + Sync + 'static,
    {
        self.result_observer = Some(Arc::new(f));
        self
    }

    pub fn with_format_error_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(FormattedError) -> FormattedError + Send + Sync + 'static,
    {
        self.format_error_fn = Some(Arc::new(f));
        self
    }

    pub fn with_renderer(mut self, renderer: impl UiRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn with_assets(mut self, assets: impl AssetStore + 'static) -> Self {
        self.assets = Some(Arc::new(assets));
        self
    }

    pub fn with_max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }
}

struct Inner {
    engine: Arc<dyn ExecutionEngine>,
    formatter: ResultFormatter,
    ui_flags: UiFlags,
    root_object_fn: Option<RootObjectFn>,
    result_observer: Option<ResultObserverFn>,
    format_error_fn: Option<FormatErrorFn>,
    renderer: Arc<dyn UiRenderer>,
    assets: Option<Arc<dyn AssetStore>>,
    max_body_size: usize,
}

/// GraphQL-over-HTTP handler. Cheap to clone.
#[derive(Clone)]
pub struct GraphQLHandler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for GraphQLHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQLHandler")
            .field("pretty", &self.inner.formatter.is_pretty())
            .field("ui_flags", &self.inner.ui_flags)
            .field("assets", &self.inner.assets.is_some())
            .field("max_body_size", &self.inner.max_body_size)
            .finish_non_exhaustive()
    }
}

impl GraphQLHandler {
    /// Build a handler. Fails when no engine is configured.
    pub fn new(options: HandlerOptions) -> Result<Self, HandlerError> {
        let engine = options.engine.ok_or(HandlerError::MissingEngine)?;
        let ui_flags = UiFlags {
            graphiql_enabled: options.graphiql,
            playground_enabled: options.playground,
        };

        tracing::info!(
            pretty = options.pretty,
            graphiql = ui_flags.graphiql_enabled,
            playground = ui_flags.playground_enabled,
            static_assets = options.assets.is_some(),
            "GraphQL handler configured"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                engine,
                formatter: ResultFormatter::new(options.pretty),
                ui_flags,
                root_object_fn: options.root_object_fn,
                result_observer: options.result_observer,
                format_error_fn: options.format_error_fn,
                renderer: options.renderer,
                assets: options.assets,
                max_body_size: options.max_body_size,
            }),
        })
    }

    /// Axum router sending every path and method to this handler.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(graphql_handler))
            .route("/{*path}", any(graphql_handler))
            .with_state(self.clone())
    }

    /// Handle one request end to end.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let (parts, body) = request.into_parts();

        let body = match axum::body::to_bytes(body, self.inner.max_body_size).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read request body, treating it as empty");
                Bytes::new()
            }
        };

        let request = ExecutionRequest::resolve(&parts, &body);
        let context = Arc::new(RequestContext::from_parts(&parts));

        let root_object = self.inner.root_object_fn.as_ref().map(|f| f(context.as_ref()));
        let params = ExecutionParams {
            request,
            context: Arc::clone(&context),
            root_object,
        };
        let result = self.inner.engine.execute(params.clone()).await;
        if result.has_errors() {
            metrics::record_errors(result.errors.len());
        }

        let mode = NegotiationContext::from_parts(&parts, self.inner.ui_flags).route();
        let response = match mode {
            ResponseMode::Interactive(kind) => self.render_ui(kind, &parts, params, result),
            ResponseMode::StaticAsset => self.serve_asset(parts.uri.path()).await,
            ResponseMode::Json => self.emit_json(&context, &params, result),
        };

        let status = response.status();
        tracing::debug!(
            request_id = context.request_id.as_deref().unwrap_or("unknown"),
            method = %parts.method,
            path = %parts.uri.path(),
            mode = mode.as_str(),
            status = status.as_u16(),
            "GraphQL request handled"
        );
        metrics::record_request(parts.method.as_str(), status.as_u16(), mode.as_str(), start);

        response
    }

    fn render_ui(
        &self,
        kind: UiKind,
        parts: &Parts,
        params: ExecutionParams,
        mut result: ExecutionResult,
    ) -> Response {
        if let Some(reshape) = &self.inner.format_error_fn {
            result.reshape_errors(reshape.as_ref());
        }

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or_default()
            .to_owned();

        let ExecutionRequest {
            query,
            variables,
            operation_name,
        } = params.request;

        let page = UiPage {
            path: parts.uri.path().to_owned(),
            host,
            query,
            variables,
            operation_name,
            result: Some(result),
        };

        match self.inner.renderer.render(kind, &page) {
            Ok(html) => response::html(html),
            Err(err) => {
                tracing::error!(ui = kind.as_str(), error = %err, "Failed to render UI page");
                response::internal_error(err.to_string())
            }
        }
    }

    async fn serve_asset(&self, path: &str) -> Response {
        let Some(store) = self.inner.assets.clone() else {
            tracing::debug!(path = %path, "No static asset store configured");
            return response::not_found();
        };

        let relative = static_asset_path(path).unwrap_or_default().into_owned();
        let lookup = relative.clone();
        let found = tokio::task::spawn_blocking(move || store.find(&lookup)).await;

        match found {
            Ok(Ok(asset)) => response::asset(&asset.content_type, asset.bytes),
            Ok(Err(AssetError::NotFound(_))) => {
                tracing::debug!(path = %relative, "Static asset not found");
                response::not_found()
            }
            Ok(Err(err)) => {
                tracing::error!(path = %relative, error = %err, "Failed to load static asset");
                response::asset(&guess_content_type(&relative, &[]), Bytes::new())
            }
            Err(err) => {
                tracing::error!(path = %relative, error = %err, "Static asset lookup task failed");
                response::asset(&guess_content_type(&relative, &[]), Bytes::new())
            }
        }
    }

    fn emit_json(
        &self,
        context: &RequestContext,
        params: &ExecutionParams,
        mut result: ExecutionResult,
    ) -> Response {
        let bytes = match self
            .inner
            .formatter
            .format(&mut result, self.inner.format_error_fn.as_ref())
        {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(error = %err, "Failed to serialize GraphQL result");
                return response::empty(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let response = response::json(bytes.clone());
        if let Some(observer) = &self.inner.result_observer {
            observer(context, params, &result, &bytes[..]);
        }
        response
    }
}

async fn graphql_handler(State(handler): State<GraphQLHandler>, request: Request<Body>) -> Response {
    handler.handle(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::assets::{Asset, MemoryAssetStore};
    use crate::graphql::ui::RenderError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use serde_json::json;
    use tower::ServiceExt;

    fn hero_engine() -> impl ExecutionEngine {
        |params: ExecutionParams| async move {
            if params.request.query.contains("hero") {
                ExecutionResult {
                    data: Some(json!({ "hero": { "name": "R2-D2" } })),
                    ..ExecutionResult::default()
                }
            } else {
                ExecutionResult {
                    data: None,
                    errors: vec![FormattedError::new("Must provide an operation.")],
                    extensions: None,
                }
            }
        }
    }

    fn handler(options: HandlerOptions) -> GraphQLHandler {
        GraphQLHandler::new(options.with_engine(hero_engine())).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[test]
    fn test_missing_engine_fails_fast() {
        let err = GraphQLHandler::new(HandlerOptions::default()).unwrap_err();
        assert!(matches!(err, HandlerError::MissingEngine));
    }

    #[test]
    fn test_default_options() {
        let options = HandlerOptions::default();
        assert!(options.pretty);
        assert!(options.graphiql);
        assert!(!options.playground);
        assert!(options.assets.is_none());
    }

    #[tokio::test]
    async fn test_json_response() {
        let handler = handler(HandlerOptions::default().with_pretty(false));
        let request = Request::get("/graphql?query=%7Bhero%7Bname%7D%7D")
            .body(Body::empty())
            .unwrap();

        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "application/json; charset=utf-8");
        assert_eq!(body_text(response).await, r#"{"data":{"hero":{"name":"R2-D2"}}}"#);
    }

    #[tokio::test]
    async fn test_observer_sees_serialized_bytes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = handler(HandlerOptions::default().with_pretty(false).with_result_observer(
            move |_ctx: &RequestContext, params: &ExecutionParams, result: &ExecutionResult, body: &[u8]| {
                assert!(!result.has_errors());
                assert_eq!(params.request.operation_name, "HeroNameQuery");
                sink.lock().unwrap().extend_from_slice(body);
            },
        ));
        let request = Request::get("/graphql?query=query%20HeroNameQuery%20%7Bhero%7Bname%7D%7D&operationName=HeroNameQuery")
            .body(Body::empty())
            .unwrap();

        let response = handler.handle(request).await;
        let body = body_text(response).await;
        assert_eq!(seen.lock().unwrap().as_slice(), body.as_bytes());
    }

    #[tokio::test]
    async fn test_observer_not_called_for_ui() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = handler(HandlerOptions::default().with_result_observer(
            move |_: &RequestContext, _: &ExecutionParams, _: &ExecutionResult, _: &[u8]| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        ));
        let request = Request::get("/graphql")
            .header(header::ACCEPT, "text/html")
            .body(Body::empty())
            .unwrap();

        let response = handler.handle(request).await;
        assert_eq!(content_type(&response), "text/html; charset=utf-8");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ui_page_embeds_reshaped_errors() {
        let handler = handler(
            HandlerOptions::default()
                .with_format_error_fn(|err| FormattedError::new(format!("masked: {}", err.message))),
        );
        let request = Request::get("/graphql?query=%7Bvillain%7D")
            .header(header::ACCEPT, "text/html")
            .body(Body::empty())
            .unwrap();

        let body = body_text(handler.handle(request).await).await;
        assert!(body.contains("masked: Must provide an operation."));
    }

    #[tokio::test]
    async fn test_render_failure_is_500_with_message() {
        struct Broken;
        impl UiRenderer for Broken {
            fn render(&self, _: UiKind, _: &UiPage) -> Result<String, RenderError> {
                Err(RenderError::Template(minijinja::Error::new(
                    minijinja::ErrorKind::UndefinedError,
                    "Query",
                )))
            }
        }

        let handler = handler(HandlerOptions::default().with_renderer(Broken));
        let request = Request::get("/graphql")
            .header(header::ACCEPT, "text/html")
            .body(Body::empty())
            .unwrap();

        let response = handler.handle(request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.starts_with("failed to render template:"));
        assert!(body.contains("Query"));
    }

    #[tokio::test]
    async fn test_static_asset_served_and_missing() {
        let assets = MemoryAssetStore::new().with_asset("graphiql/graphiql.css", "body {}");
        let router = handler(HandlerOptions::default().with_assets(assets)).router();

        let found = router
            .clone()
            .oneshot(Request::get("/graphql/static/graphiql/graphiql.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(found.status(), StatusCode::OK);
        assert_eq!(content_type(&found), "text/css");
        assert_eq!(body_text(found).await, "body {}");

        let missing = router
            .oneshot(Request::get("/graphql/static/nope.js?raw").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(body_text(missing).await.is_empty());
    }

    #[tokio::test]
    async fn test_static_asset_name_is_percent_decoded() {
        let assets = MemoryAssetStore::new().with_asset("playground/my file.css", ".a {}");
        let router = handler(HandlerOptions::default().with_assets(assets)).router();

        let response = router
            .oneshot(
                Request::get("/graphql/static/playground/my%20file.css")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, ".a {}");
    }

    #[tokio::test]
    async fn test_decoded_traversal_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("static");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(dir.path().join("secret.txt"), "hunter2").unwrap();

        let router = handler(HandlerOptions::default().with_assets(DirAssetStore::new(&root))).router();
        let response = router
            .oneshot(Request::get("/graphql/static/..%2Fsecret.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_asset_io_fault_is_200_with_empty_body() {
        struct FailingStore;
        impl AssetStore for FailingStore {
            fn find(&self, path: &str) -> Result<Asset, AssetError> {
                Err(AssetError::Io {
                    path: path.to_owned(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                })
            }
        }

        let router = handler(HandlerOptions::default().with_assets(FailingStore)).router();
        let response = router
            .oneshot(Request::get("/graphql/static/x.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), "text/css");
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_static_path_without_store_is_404() {
        let handler = handler(HandlerOptions::default());
        let response = handler
            .handle(Request::get("/static/app.js").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_body_degrades_to_empty_request() {
        let handler = handler(HandlerOptions::default().with_pretty(false).with_max_body_size(8));
        let request = Request::post("/graphql")
            .header(header::CONTENT_TYPE, "application/graphql")
            .body(Body::from("{ hero { name } }"))
            .unwrap();

        let body = body_text(handler.handle(request).await).await;
        assert!(body.contains("Must provide an operation."));
    }
}
