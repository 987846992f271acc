use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::page::{ButtonId, IconScope, Page};
use super::request::ToggleRequest;
use super::transport::Transport;

/// A click on a bookmark button.
#[derive(Debug)]
pub struct ClickEvent {
    pub target: ButtonId,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn new(target: ButtonId) -> Self {
        ClickEvent {
            target,
            default_prevented: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

struct InFlight {
    generation: u64,
    token: CancellationToken,
}

/// Wires bookmark button clicks to the toggle endpoint and repaints icons
/// from the server's answer.
///
/// Every click schedules one request and returns. Requests for different
/// buttons run independently and apply in whatever order they complete. A new
/// click on a button still sends its request but discards the answer to the
/// one it supersedes.
pub struct BookmarkToggle<T: Transport> {
    transport: Arc<T>,
    page: Arc<Mutex<Page>>,
    csrf_token: Arc<str>,
    scope: IconScope,
    in_flight: Arc<Mutex<HashMap<ButtonId, InFlight>>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
    generation: AtomicU64,
}

impl<T: Transport> BookmarkToggle<T> {
    pub fn new(transport: T, page: Page, csrf_token: impl Into<String>, scope: IconScope) -> Self {
        let csrf_token: String = csrf_token.into();
        BookmarkToggle {
            transport: Arc::new(transport),
            page: Arc::new(Mutex::new(page)),
            csrf_token: Arc::from(csrf_token),
            scope,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            pending: Mutex::new(vec![]),
            generation: AtomicU64::new(0),
        }
    }

    pub fn scope(&self) -> IconScope {
        self.scope
    }

    /// Handles one click. Always suppresses the default action; returns
    /// whether a request was scheduled.
    pub async fn click(&self, event: &mut ClickEvent) -> bool {
        event.prevent_default();

        let Some(button) = self.page.lock().await.button(event.target).cloned() else {
            tracing::debug!(button = event.target.0, "click on unknown bookmark button");
            return false;
        };

        let url = button.url.clone().unwrap_or_default();
        let request = ToggleRequest::from_button(&button, &self.csrf_token);
        let token = CancellationToken::new();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        if let Some(previous) = self.in_flight.lock().await.insert(
            button.id,
            InFlight {
                generation,
                token: token.clone(),
            },
        ) {
            tracing::debug!(button = button.id.0, "superseding in-flight bookmark toggle");
            previous.token.cancel();
        }

        let transport = self.transport.clone();
        let page = self.page.clone();
        let in_flight = self.in_flight.clone();
        let scope = self.scope;

        let handle = tokio::spawn(async move {
            // a superseded request is still sent; only its response is dropped
            match transport.send(&url, &request).await {
                Ok(response) => {
                    let mut page = page.lock().await;
                    if token.is_cancelled() {
                        tracing::debug!(post_pk = %request.post_pk, "dropping superseded bookmark response");
                    } else if let Some(state) = response.state() {
                        let touched = page.apply(state, scope, button.id);
                        tracing::info!(
                            post_pk = %request.post_pk,
                            outcome = state.message(),
                            icons = touched,
                            "bookmark toggled"
                        );
                    } else {
                        tracing::debug!(
                            post_pk = %request.post_pk,
                            reply = ?response.message,
                            "unrecognised bookmark message, icons unchanged"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(post_pk = %request.post_pk, url = %url, error = %e, "bookmark toggle failed");
                }
            }

            let mut in_flight = in_flight.lock().await;
            if in_flight
                .get(&button.id)
                .is_some_and(|f| f.generation == generation)
            {
                in_flight.remove(&button.id);
            }
        });

        self.pending.lock().await.push(handle);
        true
    }

    /// Waits until every scheduled request has finished.
    pub async fn settle(&self) {
        loop {
            let handles: Vec<_> = self.pending.lock().await.drain(..).collect();
            if handles.is_empty() {
                return;
            }
            for result in join_all(handles).await {
                if let Err(e) = result {
                    tracing::error!(error = %e, "bookmark toggle task failed");
                }
            }
        }
    }

    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// Copy of the page as it currently looks.
    pub async fn page(&self) -> Page {
        self.page.lock().await.clone()
    }
}
