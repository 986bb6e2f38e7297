//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID assigned or kept)
//!     → graphql::GraphQLHandler (resolve, execute, negotiate)
//!     → response.rs (JSON / HTML / asset / error shapes)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod tls;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
