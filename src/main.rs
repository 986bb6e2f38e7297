//! GraphQL-over-HTTP server (demo binary)
//!
//! Serves a small Star Wars schema through the library's handler.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request ID, trace, timeout, body limit)
//!                        │
//!                        ▼
//!                     graphql::handler
//!                        │  resolve  → request.rs
//!                        │  execute  → engine.rs (async-graphql schema)
//!                        │  negotiate→ negotiate.rs
//!                        ▼
//!     ◀────────────── JSON | GraphiQL / Playground | static asset
//!
//!     Cross-cutting: config (TOML), observability (tracing, Prometheus),
//!                    lifecycle (signals → graceful shutdown)
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde_json::{Map, Value};
use tokio::net::TcpListener;

use graphql_http_handler::config::{load_config, validate_config, ConfigError, ServerConfig};
use graphql_http_handler::graphql::{GraphQLHandler, HandlerOptions, RequestContext};
use graphql_http_handler::http::HttpServer;
use graphql_http_handler::lifecycle::{signals, Shutdown};
use graphql_http_handler::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "graphql-http-handler")]
#[command(about = "Serve a demo GraphQL schema over HTTP", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

mod starwars {
    use async_graphql::{Context, EmptyMutation, EmptySubscription, Enum, Object, Schema, SimpleObject};
    use graphql_http_handler::graphql::engine::RootObject;

    pub type StarWarsSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

    #[derive(Enum, Copy, Clone, Eq, PartialEq)]
    pub enum Episode {
        NewHope,
        Empire,
        Jedi,
    }

    #[derive(SimpleObject, Clone)]
    pub struct Character {
        id: String,
        name: String,
        appears_in: Vec<Episode>,
    }

    #[derive(SimpleObject, Clone)]
    pub struct Ship {
        id: String,
        name: String,
    }

    #[derive(SimpleObject, Clone)]
    pub struct Faction {
        id: String,
        name: String,
        ships: Vec<Ship>,
    }

    fn character(id: &str, name: &str) -> Character {
        Character {
            id: id.to_string(),
            name: name.to_string(),
            appears_in: vec![Episode::NewHope, Episode::Empire, Episode::Jedi],
        }
    }

    fn ship(id: &str, name: &str) -> Ship {
        Ship {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    pub struct QueryRoot;

    #[Object]
    impl QueryRoot {
        /// R2-D2 unless the episode is Empire, where Luke is the hero.
        async fn hero(&self, episode: Option<Episode>) -> Character {
            match episode {
                Some(Episode::Empire) => character("1000", "Luke Skywalker"),
                _ => character("2001", "R2-D2"),
            }
        }

        async fn rebels(&self) -> Faction {
            Faction {
                id: "RmFjdGlvbjox".to_string(),
                name: "Alliance to Restore the Republic".to_string(),
                ships: vec![
                    ship("U2hpcDox", "X-Wing"),
                    ship("U2hpcDoy", "Y-Wing"),
                    ship("U2hpcDoz", "A-Wing"),
                    ship("U2hpcDo0", "Millenium Falcon"),
                    ship("U2hpcDo1", "Home One"),
                ],
            }
        }

        /// Request ID seen by the HTTP layer, read from the root object.
        async fn request_id(&self, ctx: &Context<'_>) -> Option<String> {
            ctx.data_opt::<RootObject>()
                .and_then(|root| root.0.get("requestId"))
                .and_then(|id| id.as_str())
                .map(str::to_owned)
        }
    }

    pub fn schema() -> StarWarsSchema {
        Schema::build(QueryRoot, EmptyMutation, EmptySubscription).finish()
    }
}

fn root_object(ctx: &RequestContext) -> Map<String, Value> {
    let mut root = Map::new();
    if let Some(id) = &ctx.request_id {
        root.insert("requestId".to_string(), Value::String(id.clone()));
    }
    root
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!("graphql-http-handler v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        graphiql = config.graphql.graphiql,
        playground = config.graphql.playground,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(err) = metrics::init_metrics(addr) {
                    tracing::error!(error = %err, "Failed to start metrics endpoint");
                }
            }
            Err(err) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %err,
                "Failed to parse metrics address"
            ),
        }
    }

    let options = HandlerOptions::from_config(&config.graphql, config.limits.max_body_size)
        .with_engine(starwars::schema())
        .with_root_object_fn(root_object);
    let handler = GraphQLHandler::new(options)?;

    let addr: SocketAddr = config.listener.bind_address.parse()?;
    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let tls = config.listener.tls.clone();
    let server = HttpServer::new(config, handler);
    match tls {
        Some(tls) => server.run_tls(addr, &tls, shutdown.subscribe()).await?,
        None => {
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
