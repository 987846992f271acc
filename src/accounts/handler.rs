use axum::{
    Form,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::auth;
use crate::error::HandlerError;
use crate::handler::AppState;
use crate::post::escape_html;

#[derive(Debug, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n,
        _ => "/",
    }
}

fn login_page(next: &str, error: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape_html(e)))
        .unwrap_or_default();
    format!(
        r#"
        <!doctype html>
        <html>
            <head></head>
            <body>
                {error}
                <form action="/accounts/login/" method="post">
                    <input type="hidden" name="next" value="{next}">
                    <label>Email <input type="email" name="email"></label>
                    <label>Password <input type="password" name="password"></label>
                    <input type="submit" value="Log in">
                </form>
            </body>
        </html>
        "#,
        next = escape_html(next),
    )
}

pub async fn show_login_form(Query(params): Query<NextParam>) -> Html<String> {
    Html(login_page(safe_next(params.next.as_deref()), None))
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();

    let user = match state.db.authenticate(&form.email, &form.password).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::info!("rejected login attempt");
            return (
                StatusCode::UNAUTHORIZED,
                Html(login_page(&next, Some("Invalid email or password."))),
            )
                .into_response();
        }
        Err(e) => return HandlerError::from(e).into_response(),
    };

    // a fresh login never keeps the previous session key or CSRF token
    if let Some(old) = auth::cookie_value(&headers, auth::SESSION_COOKIE) {
        if let Err(e) = state.db.delete_session(&old).await {
            return HandlerError::from(e).into_response();
        }
    }

    match state.db.create_session(user.id, state.session_ttl_hours).await {
        Ok(session) => {
            tracing::info!(user_id = user.id, "user logged in");
            (
                StatusCode::SEE_OTHER,
                [
                    (header::SET_COOKIE, auth::session_cookie(&session.key, state.session_ttl_hours)),
                    (header::LOCATION, next),
                ],
            )
                .into_response()
        }
        Err(e) => HandlerError::from(e.context("failed to create session")).into_response(),
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(key) = auth::cookie_value(&headers, auth::SESSION_COOKIE) {
        if let Err(e) = state.db.delete_session(&key).await {
            return HandlerError::from(e).into_response();
        }
    }

    (
        StatusCode::SEE_OTHER,
        [
            (header::SET_COOKIE, auth::clear_session_cookie()),
            (header::LOCATION, "/".to_string()),
        ],
    )
        .into_response()
}
