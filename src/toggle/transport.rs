use std::future::Future;
use std::time::Duration;

use reqwest::{Url, header};

use super::request::{ToggleRequest, ToggleResponse};
use crate::config;
use crate::error::ToggleError;

/// Sends one toggle request and decodes the server's answer.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        url: &str,
        request: &ToggleRequest,
    ) -> impl Future<Output = Result<ToggleResponse, ToggleError>> + Send;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    session: Option<String>,
}

impl HttpTransport {
    pub fn new(cfg: &config::Client) -> Result<Self, ToggleError> {
        let base_url = Url::parse(&cfg.base_url).map_err(|e| ToggleError::InvalidUrl {
            url: cfg.base_url.clone(),
            reason: e.to_string(),
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = cfg.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(HttpTransport {
            client: builder.build()?,
            base_url,
            session: cfg.session.clone(),
        })
    }

    pub fn with_session(mut self, session: Option<String>) -> Self {
        if session.is_some() {
            self.session = session;
        }
        self
    }

    /// Resolves a `data-url` value the way a browser resolves it against the page.
    pub fn resolve(&self, url: &str) -> Result<Url, ToggleError> {
        self.base_url.join(url).map_err(|e| ToggleError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, url: &str, request: &ToggleRequest) -> Result<ToggleResponse, ToggleError> {
        let target = self.resolve(url)?;

        let mut req = self
            .client
            .post(target)
            .header("X-Requested-With", "XMLHttpRequest")
            .form(request);
        if let Some(key) = &self.session {
            req = req.header(header::COOKIE, format!("sessionid={}", key));
        }

        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ToggleError::Status(status.as_u16()));
        }

        let body = res.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
