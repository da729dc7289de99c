use std::env;
use std::net::SocketAddr;

use crate::error::AppError;
use crate::session::SessionMode;
use crate::supabase::SupabaseConfig;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    /// In-process store with local anonymous sessions, for offline runs.
    Memory,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub session_mode: SessionMode,
    pub magic_link_redirect: Option<String>,
    pub backend: StoreBackend,
    /// Present when `backend` is `Supabase`.
    pub supabase: Option<SupabaseConfig>,
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let bind_addr = optional_var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("Invalid BIND_ADDR: {}", e)))?;

        let session_mode = match optional_var("SESSION_MODE") {
            Some(raw) => SessionMode::parse(&raw)
                .ok_or_else(|| AppError::Config(format!("Unknown SESSION_MODE: {}", raw)))?,
            None => SessionMode::default(),
        };

        let backend = match optional_var("AGENDA_STORE").as_deref() {
            None | Some("supabase") => StoreBackend::Supabase,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(AppError::Config(format!("Unknown AGENDA_STORE: {}", other)));
            }
        };

        let supabase = match backend {
            StoreBackend::Supabase => Some(SupabaseConfig::new_from_env()?),
            StoreBackend::Memory => None,
        };

        Ok(Self {
            bind_addr,
            session_mode,
            magic_link_redirect: optional_var("MAGIC_LINK_REDIRECT"),
            backend,
            supabase,
        })
    }
}
