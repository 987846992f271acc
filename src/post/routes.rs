use axum::{
    Router,
    routing::{get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts/", post(handler::create_post))
        .route("/posts/:slug/", get(handler::post_detail))
}
