use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
mod error;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod repo_types;
pub(crate) mod services;
pub mod session;

pub use error::AuthError;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
