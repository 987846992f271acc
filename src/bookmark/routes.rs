use axum::{
    Router,
    routing::{get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts/bookmark/", post(handler::bookmark_post))
        .route("/bookmarks/", get(handler::list_bookmarks))
}
