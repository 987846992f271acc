use anyhow::Result;
use axum::http::{HeaderMap, header};
use rand::{Rng, distributions::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::db::Database;
use crate::model::{Session, User};

pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";

const TOKEN_LEN: usize = 32;

/// Random alphanumeric string used for session keys, CSRF tokens and salts.
pub fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Encoded argon2 hash; the salt travels inside the returned string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = random_token();
    let config = argon2::Config::default();
    Ok(argon2::hash_encoded(password.as_bytes(), salt.as_bytes(), &config)?)
}

pub fn verify_password(encoded: &str, password: &str) -> Result<bool> {
    Ok(argon2::verify_encoded(encoded, password.as_bytes())?)
}

/// Compares two tokens in time independent of where they differ.
pub fn tokens_match(expected: &str, given: &str) -> bool {
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(given.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

pub async fn current_session(db: &Database, headers: &HeaderMap) -> Result<Option<(Session, User)>> {
    match cookie_value(headers, SESSION_COOKIE) {
        Some(key) if !key.is_empty() => db.find_session(&key).await,
        _ => Ok(None),
    }
}

pub fn session_cookie(key: &str, ttl_hours: i64) -> String {
    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        key,
        ttl_hours.max(0) * 3600
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE)
}

pub fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "XMLHttpRequest")
}
