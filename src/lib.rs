use axum::{Router, http::Method, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::handler::{AppState, healthcheck};

pub mod accounts;
pub mod api;
pub mod auth;
pub mod bookmark;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod model;
pub mod post;
pub mod toggle;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(healthcheck))
        .merge(post::routes())
        .merge(bookmark::routes())
        .nest("/accounts", accounts::routes())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header},
        response::Response,
    };
    use tower::ServiceExt;

    use crate::db::Database;
    use crate::db::tests::{memory_db, new_post, new_user};
    use crate::handler::AppState;
    use crate::model::{Post, PostStatus, Session, User};

    pub(crate) struct TestApp {
        pub db: Arc<Database>,
        pub user: User,
        pub session: Session,
        pub router: Router,
    }

    impl TestApp {
        pub async fn new() -> Self {
            let db = Arc::new(memory_db().await);
            let user = db.create_user(new_user("ada")).await.unwrap();
            let session = db.create_session(user.id, 1).await.unwrap();
            let router = crate::router(AppState {
                db: db.clone(),
                session_ttl_hours: 1,
            });
            TestApp {
                db,
                user,
                session,
                router,
            }
        }

        pub async fn post(&self, title: &str, status: PostStatus) -> Post {
            self.db
                .create_post(self.user.id, new_post(title, status))
                .await
                .unwrap()
        }

        fn cookie(&self) -> String {
            format!("sessionid={}", self.session.key)
        }

        async fn send(&self, req: Request<Body>) -> Response {
            self.router.clone().oneshot(req).await.unwrap()
        }

        pub async fn get(&self, path: &str, with_session: bool) -> Response {
            let mut req = Request::get(path);
            if with_session {
                req = req.header(header::COOKIE, self.cookie());
            }
            self.send(req.body(Body::empty()).unwrap()).await
        }

        pub async fn bookmark(&self, form: &str, xhr: bool, with_session: bool) -> Response {
            let mut req = Request::post("/posts/bookmark/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            if xhr {
                req = req.header("X-Requested-With", "XMLHttpRequest");
            }
            if with_session {
                req = req.header(header::COOKIE, self.cookie());
            }
            self.send(req.body(Body::from(form.to_string())).unwrap()).await
        }

        pub async fn post_json(&self, path: &str, body: &str, with_session: bool) -> Response {
            let mut req = Request::post(path).header(header::CONTENT_TYPE, "application/json");
            if with_session {
                req = req.header(header::COOKIE, self.cookie());
            }
            self.send(req.body(Body::from(body.to_string())).unwrap()).await
        }

        pub async fn post_form(&self, path: &str, body: &str) -> Response {
            let req = Request::post(path)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(req).await
        }

        pub async fn post_form_with_session(&self, path: &str, body: &str) -> Response {
            let req = Request::post(path)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(header::COOKIE, self.cookie())
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(req).await
        }

        /// Serves the app on an ephemeral local port and returns its base url.
        pub async fn serve(&self) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let router = self.router.clone();
            tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });
            format!("http://{}", addr)
        }
    }

    pub(crate) async fn body_text(res: Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub(crate) async fn body_json(res: Response) -> serde_json::Value {
        serde_json::from_str(&body_text(res).await).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PostStatus;
    use crate::testing::{TestApp, body_json};
    use crate::toggle::{
        BookmarkState, BookmarkToggle, ClickEvent, HttpTransport, IconScope, Page,
    };
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_healthcheck() {
        let app = TestApp::new().await;
        let res = app.get("/", false).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_click_toggles_bookmark_on_server() {
        let app = TestApp::new().await;
        let post = app.post("Round trip", PostStatus::Published).await;
        let base_url = app.serve().await;

        let cfg = config::Client {
            base_url,
            session: Some(app.session.key.clone()),
            timeout_seconds: Some(5),
            ..Default::default()
        };

        let mut page = Page::new(Some(app.session.csrf_token.clone()));
        let button = page.add_button(
            Some("/posts/bookmark/"),
            Some(&post.id.to_string()),
            BookmarkState::Removed,
        );
        let csrf = page.csrf_token();
        let toggle = BookmarkToggle::new(HttpTransport::new(&cfg).unwrap(), page, csrf, IconScope::Button);

        toggle.click(&mut ClickEvent::new(button)).await;
        toggle.settle().await;
        let page = toggle.page().await;
        let icon = page.icon(page.button(button).unwrap().icon).unwrap();
        assert_eq!(icon.state(), Some(BookmarkState::Bookmarked));
        assert!(app.db.is_bookmarked(post.id, app.user.id).await.unwrap());

        toggle.click(&mut ClickEvent::new(button)).await;
        toggle.settle().await;
        let page = toggle.page().await;
        let icon = page.icon(page.button(button).unwrap().icon).unwrap();
        assert_eq!(icon.state(), Some(BookmarkState::Removed));
        assert!(!app.db.is_bookmarked(post.id, app.user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejected_click_leaves_icon() {
        let app = TestApp::new().await;
        let post = app.post("Guarded", PostStatus::Published).await;
        let base_url = app.serve().await;

        let cfg = config::Client {
            base_url,
            session: Some(app.session.key.clone()),
            ..Default::default()
        };

        // no csrf input on the page: the server answers 403
        let mut page = Page::new(None);
        let button = page.add_button(
            Some("/posts/bookmark/"),
            Some(&post.id.to_string()),
            BookmarkState::Removed,
        );
        let toggle = BookmarkToggle::new(HttpTransport::new(&cfg).unwrap(), page, "", IconScope::Page);

        let mut event = ClickEvent::new(button);
        toggle.click(&mut event).await;
        toggle.settle().await;

        assert!(event.default_prevented());
        let page = toggle.page().await;
        assert_eq!(page.icons()[0].state(), Some(BookmarkState::Removed));
        assert!(!app.db.is_bookmarked(post.id, app.user.id).await.unwrap());
    }
}
