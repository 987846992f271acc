use crate::model::Post;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
pub struct QueryParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Default)]
pub struct APIResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub posts: Vec<Post>,
}

impl APIResponse {
    pub fn new_from_msg(msg: &str) -> Self {
        APIResponse {
            status: msg.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_posts(msg: &str, page: u32, posts: Vec<Post>) -> Self {
        APIResponse {
            status: msg.to_owned(),
            page: Some(page),
            posts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
