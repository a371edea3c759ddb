//! API routes for the diversion decision server.

pub mod decisions;
mod routes;
pub mod ws;

use crate::config::Config;
use axum::Router;

pub fn routes(config: &Config) -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router(config)
}
