//! Interactive UI pages (GraphiQL and GraphQL Playground).
//!
//! # Responsibilities
//! - Render the HTML shell for the selected UI
//! - Embed the current query, variables, operation and result
//!
//! # Design Decisions
//! - Pages are minijinja templates named `*.html`, so plain values are
//!   HTML auto-escaped
//! - Script values go through `tojson`, which also escapes `<`, `>` and `&`
//!   so user input cannot close the surrounding `<script>`
//! - Page assets are referenced under `static/` and served by the asset store
//! - Undefined template values are strict; any template error surfaces to
//!   the client as a 500

use std::sync::OnceLock;

use minijinja::{context, Environment, UndefinedBehavior};
use serde_json::{Map, Value};

use crate::graphql::negotiate::UiKind;
use crate::graphql::response::ExecutionResult;

/// Data available to a UI page.
#[derive(Debug, Clone, Default)]
pub struct UiPage {
    /// Request path, e.g. `/graphql`.
    pub path: String,
    /// `Host` header of the request.
    pub host: String,
    pub query: String,
    pub variables: Option<Map<String, Value>>,
    pub operation_name: String,
    pub result: Option<ExecutionResult>,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to encode template value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to render template: {0}")]
    Template(#[from] minijinja::Error),
}

/// Renders interactive UI pages.
pub trait UiRenderer: Send + Sync {
    fn render(&self, kind: UiKind, page: &UiPage) -> Result<String, RenderError>;
}

/// Built-in renderer backed by the bundled templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl UiRenderer for TemplateRenderer {
    fn render(&self, kind: UiKind, page: &UiPage) -> Result<String, RenderError> {
        match kind {
            UiKind::GraphiQL => render_graphiql(page),
            UiKind::Playground => render_playground(page),
        }
    }
}

fn environment() -> &'static Environment<'static> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env
    })
}

/// Compile and render a bundled template. The name picks the auto-escape mode.
fn render_template(
    name: &'static str,
    source: &'static str,
    ctx: minijinja::Value,
) -> Result<String, RenderError> {
    let template = environment().template_from_named_str(name, source)?;
    Ok(template.render(ctx)?)
}

fn render_graphiql(page: &UiPage) -> Result<String, RenderError> {
    let variables = match &page.variables {
        Some(vars) => serde_json::to_string_pretty(vars)?,
        None => String::new(),
    };

    let response = match &page.result {
        Some(result) if !page.query.is_empty() => serde_json::to_string_pretty(result)?,
        _ => String::new(),
    };

    render_template(
        "graphiql.html",
        GRAPHIQL_TEMPLATE,
        context! {
            query => page.query,
            response => response,
            variables => variables,
            operation_name => page.operation_name,
        },
    )
}

fn render_playground(page: &UiPage) -> Result<String, RenderError> {
    render_template(
        "playground.html",
        PLAYGROUND_TEMPLATE,
        context! {
            path => page.path.strip_prefix('/').unwrap_or(&page.path),
            endpoint => page.path,
            subscription_endpoint => format!("ws://{}/subscriptions", page.host),
            set_title => true,
        },
    )
}

const GRAPHIQL_TEMPLATE: &str = r#"<!--
The request to this GraphQL server provided the header "Accept: text/html"
and as a result has been presented GraphiQL - an in-browser IDE for
exploring GraphQL.

If you wish to receive JSON, provide the header "Accept: application/json" or
add "&raw" to the end of the URL within a browser.
-->
<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <title>GraphiQL</title>
  <meta name="robots" content="noindex" />
  <meta name="referrer" content="origin">
  <style>
    body {
      height: 100%;
      margin: 0;
      overflow: hidden;
      width: 100%;
    }
    #graphiql {
      height: 100vh;
    }
  </style>
  <link href="static/graphiql/graphiql.css" rel="stylesheet" />
  <script src="static/graphiql/es6-promise.auto.min.js"></script>
  <script src="static/graphiql/fetch.min.js"></script>
  <script src="static/graphiql/react.min.js"></script>
  <script src="static/graphiql/react-dom.min.js"></script>
  <script src="static/graphiql/graphiql.min.js"></script>
</head>
<body>
  <div id="graphiql">Loading...</div>
  <script>
    var parameters = {};
    window.location.search.substr(1).split('&').forEach(function (entry) {
      var eq = entry.indexOf('=');
      if (eq >= 0) {
        parameters[decodeURIComponent(entry.slice(0, eq))] =
          decodeURIComponent(entry.slice(eq + 1));
      }
    });

    function locationQuery(params) {
      return '?' + Object.keys(params).filter(function (key) {
        return Boolean(params[key]);
      }).map(function (key) {
        return encodeURIComponent(key) + '=' +
          encodeURIComponent(params[key]);
      }).join('&');
    }

    var graphqlParamNames = {
      query: true,
      variables: true,
      operationName: true
    };

    var otherParams = {};
    for (var k in parameters) {
      if (parameters.hasOwnProperty(k) && graphqlParamNames[k] !== true) {
        otherParams[k] = parameters[k];
      }
    }
    var fetchURL = locationQuery(otherParams);

    function graphQLFetcher(graphQLParams) {
      return fetch(fetchURL, {
        method: 'post',
        headers: {
          'Accept': 'application/json',
          'Content-Type': 'application/json'
        },
        body: JSON.stringify(graphQLParams),
        credentials: 'include',
      }).then(function (response) {
        return response.text();
      }).then(function (responseBody) {
        try {
          return JSON.parse(responseBody);
        } catch (error) {
          return responseBody;
        }
      });
    }

    function onEditQuery(newQuery) {
      parameters.query = newQuery;
      updateURL();
    }

    function onEditVariables(newVariables) {
      parameters.variables = newVariables;
      updateURL();
    }

    function onEditOperationName(newOperationName) {
      parameters.operationName = newOperationName;
      updateURL();
    }

    function updateURL() {
      history.replaceState(null, null, locationQuery(parameters));
    }

    ReactDOM.render(
      React.createElement(GraphiQL, {
        fetcher: graphQLFetcher,
        onEditQuery: onEditQuery,
        onEditVariables: onEditVariables,
        onEditOperationName: onEditOperationName,
        query: {{ query|tojson }},
        response: {{ response|tojson }},
        variables: {{ variables|tojson }},
        operationName: {{ operation_name|tojson }},
      }),
      document.getElementById('graphiql')
    );
  </script>
</body>
</html>
"#;

const PLAYGROUND_TEMPLATE: &str = r#"<!--
The request to this GraphQL server provided the header "Accept: text/html"
and as a result has been presented Playground - an in-browser IDE for
exploring GraphQL.

If you wish to receive JSON, provide the header "Accept: application/json" or
add "&raw" to the end of the URL within a browser.
-->
<!DOCTYPE html>
<html>

<head>
  <meta charset=utf-8/>
  <meta name="viewport" content="user-scalable=no, initial-scale=1.0, minimum-scale=1.0, maximum-scale=1.0, minimal-ui">
  <title>GraphQL Playground</title>
  <link rel="stylesheet" href="{{ path }}/static/playground/index.css" />
  <link rel="shortcut icon" href="{{ path }}/static/playground/favicon.png" />
  <script src="{{ path }}/static/playground/middleware.js"></script>
</head>

<body>
  <div id="root">
    <style>
      body {
        background-color: rgb(23, 42, 58);
        font-family: Open Sans, sans-serif;
        height: 90vh;
      }
      #root {
        height: 100%;
        width: 100%;
        display: flex;
        align-items: center;
        justify-content: center;
      }
      .loading {
        font-size: 32px;
        font-weight: 200;
        color: rgba(255, 255, 255, .6);
        margin-left: 20px;
      }
      img {
        width: 78px;
        height: 78px;
      }
      .title {
        font-weight: 400;
      }
    </style>
    <img src='{{ path }}/static/playground/logo.png' alt=''>
    <div class="loading"> Loading
      <span class="title">GraphQL Playground</span>
    </div>
  </div>
  <script>window.addEventListener('load', function (event) {
      GraphQLPlayground.init(document.getElementById('root'), {
        endpoint: {{ endpoint|tojson }},
        subscriptionEndpoint: {{ subscription_endpoint|tojson }},
        setTitle: {{ set_title }}
      })
    })</script>
</body>

</html>
"#;
