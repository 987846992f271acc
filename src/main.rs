use std::path::PathBuf;
use std::sync::Arc;

use blogmark::config::{Cli, Command, Config, default_config_dir, default_config_path};
use blogmark::db::Database;
use blogmark::handler::AppState;
use blogmark::model::NewUser;
use blogmark::toggle::{BookmarkState, BookmarkToggle, ClickEvent, HttpTransport, IconScope, Page};
use clap::Parser;
use tokio::{signal, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    // --config puts data next to the config file; BLOGMARK_DATA_DIR wins over both
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            (path, dir)
        }
        None => (default_config_path(), default_config_dir()),
    };
    let data_dir = std::env::var("BLOGMARK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or(data_dir);

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::new_or_default(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg, data_dir).await,
        Command::CreateUser {
            email,
            username,
            first_name,
            last_name,
            password,
        } => {
            let db = open_db(&cfg, &data_dir).await;
            let input = NewUser {
                email,
                username,
                first_name,
                last_name,
                password,
            };
            match db.create_user(input).await {
                Ok(user) => tracing::info!(user_id = user.id, email = %user.email, "created user"),
                Err(e) => {
                    tracing::error!(error = %e, "failed to create user");
                    std::process::exit(1);
                }
            }
        }
        Command::Toggle {
            url,
            pk,
            csrf,
            session,
            scope,
        } => {
            let scope = scope.unwrap_or(cfg.client.icon_scope);
            if !toggle_once(&cfg, url, pk, csrf, session, scope).await {
                std::process::exit(1);
            }
        }
    }
}

async fn open_db(cfg: &Config, data_dir: &PathBuf) -> Arc<Database> {
    if let Err(e) = std::fs::create_dir_all(data_dir) {
        tracing::error!(error = %e, dir = ?data_dir, "failed to create data directory");
        std::process::exit(1);
    }

    Arc::new(Database::new(cfg, data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }))
}

async fn serve(cfg: Config, data_dir: PathBuf) {
    tracing::info!("blogmark.svc starting");
    let db = open_db(&cfg, &data_dir).await;

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let cancellation_token = CancellationToken::new();
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel::<()>(1);

    // Expired sessions are swept every 5 minutes
    let cleanup_db = db.clone();
    let cleanup_token = cancellation_token.clone();
    let cleanup_done = shutdown_complete_tx.clone();
    tokio::spawn(async move {
        let _done = cleanup_done;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match cleanup_db.delete_expired_sessions().await {
                        Ok(0) => {}
                        Ok(n) => tracing::info!(removed = n, "removed expired sessions"),
                        Err(e) => tracing::warn!("failed to remove expired sessions: {}", e),
                    }
                    if let Err(e) = cleanup_db.sync().await {
                        tracing::warn!("failed to sync database: {}", e);
                    }
                }
                _ = cleanup_token.cancelled() => {
                    tracing::info!("session cleanup task shutting down");
                    break;
                }
            }
        }
    });

    let app = blogmark::router(AppState {
        db,
        session_ttl_hours: cfg.app.session_ttl_hours,
    });

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("blogmark.svc running on {}", &address);
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "server stopped unexpectedly");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
            cancellation_token.cancel();
        }
    }

    drop(shutdown_complete_tx);
    shutdown_complete_rx.recv().await;
    tracing::info!("blogmark.svc going off, graceful shutdown complete");
}

/// Clicks a single bookmark button and prints the icon it ends up with.
async fn toggle_once(
    cfg: &Config,
    url: Option<String>,
    pk: Option<String>,
    csrf: Option<String>,
    session: Option<String>,
    scope: IconScope,
) -> bool {
    let transport = match HttpTransport::new(&cfg.client) {
        Ok(t) => t.with_session(session),
        Err(e) => {
            tracing::error!(error = %e, "failed to build http client");
            return false;
        }
    };

    let mut page = Page::new(csrf);
    let button = page.add_button(url.as_deref(), pk.as_deref(), BookmarkState::Removed);
    let csrf_token = page.csrf_token();

    let toggle = BookmarkToggle::new(transport, page, csrf_token, scope);
    toggle.click(&mut ClickEvent::new(button)).await;
    toggle.settle().await;

    let page = toggle.page().await;
    let Some(icon) = page.button(button).and_then(|b| page.icon(b.icon)) else {
        return false;
    };

    println!("{}", icon.class_attr());
    true
}
