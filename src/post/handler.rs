use axum::{
    Json,
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};

use super::render::render_post_detail;
use crate::auth;
use crate::error::HandlerError;
use crate::handler::{AppState, login_redirect};
use crate::model::NewPost;

pub async fn create_post(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Json(payload): Json<NewPost>,
) -> Response {
    let user = match auth::current_session(&state.db, &headers).await {
        Ok(Some((_, user))) => user,
        Ok(None) => return login_redirect(uri.path()),
        Err(e) => return HandlerError::from(e).into_response(),
    };

    if payload.title.trim().is_empty() {
        return HandlerError::ValidationError("title is required".to_string()).into_response();
    }

    match state.db.find_post_by_slug(&crate::db::slugify(&payload.title)).await {
        Ok(Some(_)) => {
            return HandlerError::ValidationError("a post with that title already exists".to_string())
                .into_response();
        }
        Ok(None) => {}
        Err(e) => return HandlerError::from(e).into_response(),
    }

    match state.db.create_post(user.id, payload).await {
        Ok(post) => {
            tracing::info!(post_id = post.id, slug = %post.slug, user_id = user.id, "created post");
            (StatusCode::CREATED, Json(post)).into_response()
        }
        Err(e) => {
            tracing::error!("failed to create post: {:#}", e);
            HandlerError::ValidationError("failed to create post".to_string()).into_response()
        }
    }
}

pub async fn post_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    match detail(&state, &slug, &headers).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn detail(state: &AppState, slug: &str, headers: &HeaderMap) -> Result<String, HandlerError> {
    let viewer = auth::current_session(&state.db, headers).await?;

    let Some(mut post) = state.db.find_post_by_slug(slug).await? else {
        return Err(HandlerError::NotFound(format!("post {}", slug)));
    };

    if !post.is_active {
        return Err(HandlerError::NotFound(format!("post {}", slug)));
    }

    // drafts are only visible to their author
    let viewer_id = viewer.as_ref().map(|(_, user)| user.id);
    if !post.is_published() && viewer_id != Some(post.user_id) {
        return Err(HandlerError::NotFound(format!("post {}", slug)));
    }

    post.views = state.db.increment_views(post.id).await?;

    let is_bookmarked = match viewer_id {
        Some(user_id) => state.db.is_bookmarked(post.id, user_id).await?,
        None => false,
    };
    let csrf_token = viewer.as_ref().map(|(session, _)| session.csrf_token.as_str());

    Ok(render_post_detail(&post, is_bookmarked, csrf_token))
}
