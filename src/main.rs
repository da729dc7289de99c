use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agenda::api::router;
use agenda::config::{AppConfig, StoreBackend};
use agenda::error::AppError;
use agenda::events::TaskEvents;
use agenda::session::SessionManager;
use agenda::state::AppState;
use agenda::store::MemoryStore;
use agenda::supabase::{SupabaseAuth, SupabaseStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "agenda=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;

    let state = match config.backend {
        StoreBackend::Memory => {
            info!("using in-memory store");
            AppState::offline(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Supabase => {
            let supabase = config
                .supabase
                .clone()
                .ok_or_else(|| AppError::Config("SUPABASE_URL is not set".to_string()))?;
            info!(url = %supabase.url, mode = ?config.session_mode, "using supabase store");
            let auth = Arc::new(SupabaseAuth::new(supabase.clone())?);
            let sessions = SessionManager::with_redirect(
                auth,
                config.session_mode,
                config.magic_link_redirect.clone(),
            );
            let store = Arc::new(SupabaseStore::new(supabase, sessions.clone())?);
            AppState::new(store, sessions, TaskEvents::default())
        }
    };

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
