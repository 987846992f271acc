use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{OriginalUri, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::api::{APIResponse, QueryParams};
use crate::auth::{self, CSRF_FIELD};
use crate::error::HandlerError;
use crate::handler::{AppState, login_redirect};
use crate::toggle::ToggleResponse;

const POST_PK_FIELD: &str = "postPk";

pub async fn bookmark_post(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    match toggle(&state, uri.path(), &headers, &form).await {
        Ok(res) => res,
        Err(e) => {
            tracing::info!(error = %e, "bookmark toggle rejected");
            e.into_response()
        }
    }
}

async fn toggle(
    state: &AppState,
    path: &str,
    headers: &HeaderMap,
    form: &HashMap<String, String>,
) -> Result<Response, HandlerError> {
    let Some((session, user)) = auth::current_session(&state.db, headers).await? else {
        return Ok(login_redirect(path));
    };

    let token = form.get(CSRF_FIELD).map(String::as_str).unwrap_or_default();
    if token.is_empty() || !auth::tokens_match(&session.csrf_token, token) {
        return Err(HandlerError::Forbidden("CSRF verification failed".to_string()));
    }

    if !auth::is_ajax(headers) {
        return Err(HandlerError::ValidationError(
            "bookmarks can only be toggled asynchronously".to_string(),
        ));
    }

    let post_pk: i64 = form
        .get(POST_PK_FIELD)
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| HandlerError::ValidationError(format!("{} must be an integer", POST_PK_FIELD)))?;

    let Some(post) = state.db.find_published_post(post_pk).await? else {
        return Err(HandlerError::NotFound(format!("post {}", post_pk)));
    };

    let new_state = state.db.toggle_bookmark(post.id, user.id).await?;
    tracing::info!(post_id = post.id, user_id = user.id, outcome = new_state.message(), "bookmark toggled");

    Ok((StatusCode::OK, Json(ToggleResponse::new(new_state))).into_response())
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(qp): Query<QueryParams>,
) -> Response {
    let user = match auth::current_session(&state.db, &headers).await {
        Ok(Some((_, user))) => user,
        Ok(None) => return login_redirect(uri.path()),
        Err(e) => return HandlerError::from(e).into_response(),
    };

    let hp = qp.into_handler_params();
    match state.db.list_bookmarks(user.id, hp.limit, hp.offset).await {
        Ok(posts) => {
            tracing::info!(user_id = user.id, count = posts.len(), "got bookmarks");
            (StatusCode::OK, Json(APIResponse::with_posts("got bookmarks", hp.page, posts))).into_response()
        }
        Err(e) => HandlerError::from(e.context("failed to list bookmarks")).into_response(),
    }
}
