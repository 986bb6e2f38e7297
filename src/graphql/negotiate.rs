//! Content negotiation.
//!
//! # Responsibilities
//! - Decide between interactive UI, static asset and JSON responses
//! - Honour the `raw` query flag and the per-server UI toggles
//!
//! # Design Decisions
//! - Accept matching is substring based: any JSON acceptance disqualifies the UI,
//!   so browsers get HTML and API clients always get JSON
//! - GraphiQL is checked before Playground
//! - `raw` never suppresses static asset serving

use std::borrow::Cow;

use axum::http::{header, request::Parts, Method};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

const STATIC_SEGMENT: &str = "/static/";

/// Which interactive UI to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiKind {
    GraphiQL,
    Playground,
}

impl UiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiKind::GraphiQL => "graphiql",
            UiKind::Playground => "playground",
        }
    }
}

/// Response path chosen for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Interactive(UiKind),
    StaticAsset,
    Json,
}

impl ResponseMode {
    /// Label used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Interactive(kind) => kind.as_str(),
            ResponseMode::StaticAsset => "static",
            ResponseMode::Json => "json",
        }
    }
}

/// UI toggles, fixed per server instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiFlags {
    pub graphiql_enabled: bool,
    pub playground_enabled: bool,
}

/// The parts of a request that negotiation looks at.
#[derive(Debug, Clone)]
pub struct NegotiationContext {
    pub accept_header: String,
    pub raw_override: bool,
    pub is_static_asset_path: bool,
    pub ui_flags: UiFlags,
}

impl NegotiationContext {
    pub fn from_parts(parts: &Parts, ui_flags: UiFlags) -> Self {
        let accept_header = parts
            .headers
            .get(header::ACCEPT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();

        let raw_override = parts
            .uri
            .query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).any(|(key, _)| key == "raw"))
            .unwrap_or(false);

        let is_static_asset_path =
            parts.method == Method::GET && parts.uri.path().contains(STATIC_SEGMENT);

        Self {
            accept_header,
            raw_override,
            is_static_asset_path,
            ui_flags,
        }
    }

    /// Pick the response mode. Evaluation order is fixed.
    pub fn route(&self) -> ResponseMode {
        if self.ui_flags.graphiql_enabled && self.wants_html() {
            return ResponseMode::Interactive(UiKind::GraphiQL);
        }
        if self.ui_flags.playground_enabled && self.wants_html() {
            return ResponseMode::Interactive(UiKind::Playground);
        }
        if self.is_static_asset_path {
            return ResponseMode::StaticAsset;
        }
        ResponseMode::Json
    }

    fn wants_html(&self) -> bool {
        !self.raw_override
            && !self.accept_header.contains("application/json")
            && self.accept_header.contains("text/html")
    }
}

/// Path relative to the static root: everything after the first `/static/`,
/// percent-decoded.
pub fn static_asset_path(path: &str) -> Option<Cow<'_, str>> {
    path.find(STATIC_SEGMENT)
        .map(|idx| percent_decode_str(&path[idx + STATIC_SEGMENT.len()..]).decode_utf8_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    const BROWSER_ACCEPT: &str =
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

    fn context(method: Method, uri: &str, accept: Option<&str>, flags: UiFlags) -> NegotiationContext {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(accept) = accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        NegotiationContext::from_parts(&parts, flags)
    }

    fn graphiql() -> UiFlags {
        UiFlags {
            graphiql_enabled: true,
            playground_enabled: false,
        }
    }

    fn playground() -> UiFlags {
        UiFlags {
            graphiql_enabled: false,
            playground_enabled: true,
        }
    }

    fn both() -> UiFlags {
        UiFlags {
            graphiql_enabled: true,
            playground_enabled: true,
        }
    }

    #[test]
    fn test_negotiation_table() {
        let cases = [
            ("graphiql for text/html", graphiql(), "/graphql", Some("text/html"), ResponseMode::Interactive(UiKind::GraphiQL)),
            ("graphiql for browser accept", graphiql(), "/graphql", Some(BROWSER_ACCEPT), ResponseMode::Interactive(UiKind::GraphiQL)),
            ("ui disabled", UiFlags::default(), "/graphql", Some("text/html"), ResponseMode::Json),
            ("json acceptance wins", graphiql(), "/graphql", Some("application/json,text/html"), ResponseMode::Json),
            ("no accept header", graphiql(), "/graphql", None, ResponseMode::Json),
            ("raw flag", graphiql(), "/graphql?raw", Some("text/html"), ResponseMode::Json),
            ("raw flag with value", both(), "/graphql?query=%7Bhero%7D&raw=1", Some("text/html"), ResponseMode::Json),
            ("playground for text/html", playground(), "/graphql", Some("text/html"), ResponseMode::Interactive(UiKind::Playground)),
            ("graphiql before playground", both(), "/graphql", Some("text/html"), ResponseMode::Interactive(UiKind::GraphiQL)),
            ("static asset", UiFlags::default(), "/graphql/static/app.js", None, ResponseMode::StaticAsset),
            ("static asset with raw", graphiql(), "/graphql/static/app.js?raw", Some("text/html"), ResponseMode::StaticAsset),
            ("ui beats static asset", graphiql(), "/graphql/static/app.js", Some("text/html"), ResponseMode::Interactive(UiKind::GraphiQL)),
        ];

        for (name, flags, uri, accept, expected) in cases {
            let ctx = context(Method::GET, uri, accept, flags);
            assert_eq!(ctx.route(), expected, "{name}");
        }
    }

    #[test]
    fn test_static_asset_requires_get() {
        let ctx = context(Method::POST, "/graphql/static/app.js", None, UiFlags::default());
        assert!(!ctx.is_static_asset_path);
        assert_eq!(ctx.route(), ResponseMode::Json);
    }

    #[test]
    fn test_raw_detection_ignores_other_keys() {
        let ctx = context(Method::GET, "/graphql?rawish=1&query=raw", Some("text/html"), graphiql());
        assert!(!ctx.raw_override);
        assert_eq!(ctx.route(), ResponseMode::Interactive(UiKind::GraphiQL));
    }

    #[test]
    fn test_static_asset_path_strips_prefix() {
        assert_eq!(
            static_asset_path("/graphql/static/graphiql/graphiql.css").as_deref(),
            Some("graphiql/graphiql.css")
        );
        assert_eq!(static_asset_path("/static/logo.png").as_deref(), Some("logo.png"));
        assert_eq!(static_asset_path("/a/static/b/static/c").as_deref(), Some("b/static/c"));
        assert_eq!(static_asset_path("/graphql"), None);
    }

    #[test]
    fn test_static_asset_path_is_percent_decoded() {
        assert_eq!(
            static_asset_path("/graphql/static/playground/my%20file.css").as_deref(),
            Some("playground/my file.css")
        );
        assert_eq!(
            static_asset_path("/graphql/static/..%2F..%2Fsecret").as_deref(),
            Some("../../secret")
        );
    }
}
