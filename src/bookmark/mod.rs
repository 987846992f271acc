//! Bookmark Endpoint Module
//!
//! Server side of the bookmark toggle. A logged-in reader posts a post id
//! together with their CSRF token and gets back the post's new bookmark
//! state as `{"status": "success", "message": "bookmarked" | "bookmark removed"}`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use blogmark::bookmark;
//!
//! let app = Router::new()
//!     .merge(bookmark::routes())
//!     .with_state(app_state);
//! ```

mod handler;
mod routes;

pub use routes::routes;
