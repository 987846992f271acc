//! Bookmark Toggle Module
//!
//! Client side of bookmarking: a click on a bookmark button posts the button's
//! post id and the page's CSRF token to the button's URL, and the server's
//! `message` decides how the bookmark icons are repainted.
//!
//! # Behaviour
//!
//! - `"bookmarked"` swaps `bi-bookmark` for `bi-bookmark-check-fill`
//! - `"bookmark removed"` swaps it back
//! - any other answer, and any failure, leaves the icons alone
//! - [`IconScope::Page`] repaints every `bi` icon on the page,
//!   [`IconScope::Button`] only the clicked button's icon
//!
//! # Usage
//!
//! ```rust,ignore
//! use blogmark::toggle::{BookmarkState, BookmarkToggle, ClickEvent, HttpTransport, IconScope, Page};
//!
//! let mut page = Page::new(Some(csrf_token));
//! let button = page.add_button(Some("/posts/bookmark/"), Some("1"), BookmarkState::Removed);
//!
//! let csrf = page.csrf_token();
//! let toggle = BookmarkToggle::new(HttpTransport::new(&cfg.client)?, page, csrf, IconScope::Button);
//! toggle.click(&mut ClickEvent::new(button)).await;
//! toggle.settle().await;
//! ```

mod handler;
mod page;
mod request;
mod transport;

pub use handler::{BookmarkToggle, ClickEvent};
pub use page::{
    BOOKMARKED_CLASS, BookmarkButton, ButtonId, ICON_CLASS, Icon, IconId, IconScope,
    NOT_BOOKMARKED_CLASS, Page,
};
pub use request::{BookmarkState, MESSAGE_BOOKMARKED, MESSAGE_REMOVED, ToggleRequest, ToggleResponse};
pub use transport::{HttpTransport, Transport};
