use serde::{Deserialize, Serialize};

use super::page::{BOOKMARKED_CLASS, BookmarkButton, NOT_BOOKMARKED_CLASS};

pub const MESSAGE_BOOKMARKED: &str = "bookmarked";
pub const MESSAGE_REMOVED: &str = "bookmark removed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookmarkState {
    Bookmarked,
    Removed,
}

impl BookmarkState {
    /// Only the two literal server messages map to a state.
    pub fn from_message(message: &str) -> Option<Self> {
        match message {
            MESSAGE_BOOKMARKED => Some(BookmarkState::Bookmarked),
            MESSAGE_REMOVED => Some(BookmarkState::Removed),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            BookmarkState::Bookmarked => MESSAGE_BOOKMARKED,
            BookmarkState::Removed => MESSAGE_REMOVED,
        }
    }

    pub fn icon_class(&self) -> &'static str {
        match self {
            BookmarkState::Bookmarked => BOOKMARKED_CLASS,
            BookmarkState::Removed => NOT_BOOKMARKED_CLASS,
        }
    }
}

/// Form body of one toggle click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleRequest {
    #[serde(rename = "postPk")]
    pub post_pk: String,
    pub csrfmiddlewaretoken: String,
}

impl ToggleRequest {
    pub fn from_button(button: &BookmarkButton, csrf_token: &str) -> Self {
        ToggleRequest {
            post_pk: button.post_pk.clone().unwrap_or_default(),
            csrfmiddlewaretoken: csrf_token.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ToggleResponse {
    pub fn new(state: BookmarkState) -> Self {
        ToggleResponse {
            status: Some("success".to_string()),
            message: Some(state.message().to_string()),
        }
    }

    pub fn state(&self) -> Option<BookmarkState> {
        self.message.as_deref().and_then(BookmarkState::from_message)
    }
}
