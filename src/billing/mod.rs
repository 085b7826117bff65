pub mod handlers;
pub mod stripe;
pub mod webhook;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::billing_routes()
}
