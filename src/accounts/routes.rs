use axum::{
    Router,
    routing::{get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login/", get(handler::show_login_form))
        .route("/login/", post(handler::login))
        .route("/logout/", post(handler::logout))
}
