//! HTTP surface for the AI command pipeline
//!
//! `POST /api/ai/command` streams the pipeline's events as server-sent
//! events; `/health` and `/ready` report liveness and key availability.

pub mod routes;
pub mod server;

mod error;
mod state;

pub use error::{Result, WebError};
pub use server::{build_router, start_server};
pub use state::AppState;
