pub mod images;
pub mod upload;

use axum::Router;

use crate::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new().merge(images::router()).merge(upload::router())
}
