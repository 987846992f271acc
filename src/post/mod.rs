//! Posts Module
//!
//! Post creation and the post detail page. The detail page is where bookmark
//! buttons live: each one carries `data-url` and `data-pk` and wraps a `bi`
//! icon whose second class shows whether the reader has bookmarked the post.

mod handler;
mod render;
mod routes;

pub use render::{escape_html, render_post_detail};
pub use routes::routes;
