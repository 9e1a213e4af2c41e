use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod handlers;
mod hash;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod service;

pub use jwt::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::public_routes())
        .merge(handlers::session_routes())
}
