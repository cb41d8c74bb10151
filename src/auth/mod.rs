use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use middleware::{require_auth, Principal};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
