//! GraphQL-over-HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → request.rs (resolve ExecutionRequest from query string / form / JSON / raw body)
//!     → engine.rs (execute against the configured ExecutionEngine)
//!     → negotiate.rs (pick Interactive | StaticAsset | Json)
//!     → ui.rs (render GraphiQL / Playground)
//!       | assets.rs (serve file under /static/)
//!       | response.rs (format JSON result, notify observer)
//!     → Response<Body>
//! ```
//!
//! # Design Decisions
//! - Every request runs the full state machine once; nothing is retried
//! - Malformed client input degrades to an empty request, never an HTTP error
//! - Execution happens before negotiation, so UI pages embed the result
//! - All injected collaborators are read-only after the handler is built

pub mod assets;
pub mod engine;
pub mod handler;
pub mod negotiate;
pub mod request;
pub mod response;
pub mod ui;

pub use assets::{Asset, AssetError, AssetStore, DirAssetStore, MemoryAssetStore};
pub use engine::{ExecutionEngine, ExecutionParams, RequestContext};
pub use handler::{GraphQLHandler, HandlerError, HandlerOptions, RootObjectFn};
pub use negotiate::{NegotiationContext, ResponseMode, UiFlags, UiKind};
pub use request::ExecutionRequest;
pub use response::{
    ExecutionResult, FormatErrorFn, FormattedError, Location, PathSegment, ResultFormatter,
    ResultObserverFn,
};
pub use ui::{RenderError, TemplateRenderer, UiPage, UiRenderer};
