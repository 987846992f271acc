//! Accounts Module
//!
//! Session login for readers. A successful login sets the `sessionid` cookie
//! and issues the CSRF token that bookmark requests must echo back.

mod handler;
mod routes;

pub use routes::routes;
