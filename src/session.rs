//! Session bootstrap.
//!
//! [`SessionManager`] is the one place that knows whether the app is signed
//! in. Views and HTTP handlers call [`SessionManager::ensure_session`] before
//! touching the store; concurrent callers share a single in-flight request.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;

/// Seconds before the recorded expiry at which a session counts as stale.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

impl Session {
    pub fn is_fresh_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now + EXPIRY_MARGIN_SECS < expires_at,
            None => true,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now().timestamp())
    }
}

/// Which sign-in flow the deployment uses. The two are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// Missing sessions are created transparently with an anonymous sign-in.
    #[default]
    Anonymous,
    /// Only magic-link sign-in; no session means the user must log in.
    MagicLink,
}

impl SessionMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anonymous" | "anon" => Some(SessionMode::Anonymous),
            "magic-link" | "magic_link" | "magiclink" => Some(SessionMode::MagicLink),
            _ => None,
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_anonymously(&self) -> Result<Session, AppError>;
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError>;
    async fn send_magic_link(&self, email: &str, redirect_to: Option<&str>) -> Result<(), AppError>;
    async fn verify_magic_link(&self, token_hash: &str) -> Result<Session, AppError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AppError>;
}

type SessionFlight = Shared<BoxFuture<'static, Result<Option<Session>, AppError>>>;

struct Inner {
    auth: Arc<dyn AuthProvider>,
    mode: SessionMode,
    redirect_to: Option<String>,
    current: RwLock<Option<Session>>,
    in_flight: Mutex<Option<SessionFlight>>,
}

impl Inner {
    fn cached(&self) -> Option<Session> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn store(&self, session: Option<Session>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    async fn resolve(&self) -> Result<Option<Session>, AppError> {
        if let Some(session) = self.cached() {
            if session.is_fresh() {
                return Ok(Some(session));
            }
            if let Some(refresh_token) = session.refresh_token.as_deref() {
                match self.auth.refresh_session(refresh_token).await {
                    Ok(refreshed) => {
                        debug!("refreshed session for user {}", refreshed.user.id);
                        self.store(Some(refreshed.clone()));
                        return Ok(Some(refreshed));
                    }
                    Err(e) => warn!("session refresh failed: {}", e),
                }
            }
            self.store(None);
        }

        match self.mode {
            SessionMode::Anonymous => {
                let session = self
                    .auth
                    .sign_in_anonymously()
                    .await
                    .map_err(into_session_error)?;
                info!("created anonymous session for user {}", session.user.id);
                self.store(Some(session.clone()));
                Ok(Some(session))
            }
            SessionMode::MagicLink => Ok(None),
        }
    }
}

/// Rewraps a provider failure as a session error, keeping its bare message.
fn into_session_error(e: AppError) -> AppError {
    match e {
        AppError::Session(_) | AppError::LoginRequired => e,
        AppError::Remote(msg)
        | AppError::Validation(msg)
        | AppError::BadRequest(msg)
        | AppError::Config(msg) => AppError::Session(msg),
        AppError::NotFound => AppError::Session(AppError::NotFound.to_string()),
    }
}

/// Holds the current session and coalesces concurrent bootstrap calls.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(auth: Arc<dyn AuthProvider>, mode: SessionMode) -> Self {
        Self::with_redirect(auth, mode, None)
    }

    /// `redirect_to` is passed along with magic-link requests.
    pub fn with_redirect(
        auth: Arc<dyn AuthProvider>,
        mode: SessionMode,
        redirect_to: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                auth,
                mode,
                redirect_to,
                current: RwLock::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.inner.mode
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.cached()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current().map(|s| s.access_token)
    }

    /// Installs a session obtained elsewhere (e.g. restored from disk).
    pub fn set_session(&self, session: Option<Session>) {
        self.inner.store(session);
    }

    /// Returns the current session, creating one when the mode allows it.
    ///
    /// Callers arriving while a request is in flight await the same result.
    /// The in-flight slot is cleared once it settles, success or failure, so
    /// the next call checks freshness again.
    pub async fn ensure_session(&self) -> Result<Option<Session>, AppError> {
        let flight = {
            let mut slot = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(flight) => flight.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let flight = async move { inner.resolve().await }.boxed().shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let result = flight.clone().await;

        let mut slot = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
            *slot = None;
        }
        result
    }

    /// Like [`ensure_session`](Self::ensure_session) but treats "no session"
    /// as [`AppError::LoginRequired`].
    pub async fn require_session(&self) -> Result<Session, AppError> {
        self.ensure_session().await?.ok_or(AppError::LoginRequired)
    }

    pub async fn send_magic_link(&self, email: &str) -> Result<(), AppError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::validation("Email must not be empty"));
        }
        self.inner
            .auth
            .send_magic_link(email, self.inner.redirect_to.as_deref())
            .await
    }

    /// Auth callback: exchanges the magic-link token for a session.
    pub async fn complete_magic_link(&self, token_hash: &str) -> Result<Session, AppError> {
        let session = self
            .inner
            .auth
            .verify_magic_link(token_hash)
            .await
            .map_err(into_session_error)?;
        info!("signed in user {}", session.user.id);
        self.inner.store(Some(session.clone()));
        Ok(session)
    }

    /// Drops the local session even when the remote sign-out fails.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let previous = self.current();
        self.inner.store(None);
        if let Some(session) = previous {
            self.inner.auth.sign_out(&session.access_token).await?;
        }
        Ok(())
    }
}

/// Issues local anonymous sessions; used with the in-memory store.
#[derive(Debug, Default)]
pub struct OfflineAuth;

impl OfflineAuth {
    fn mint(user_id: String) -> Session {
        Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Some(user_id.clone()),
            expires_at: Some(Utc::now().timestamp() + 3600),
            user: SessionUser {
                id: user_id,
                email: None,
                is_anonymous: true,
            },
        }
    }
}

#[async_trait]
impl AuthProvider for OfflineAuth {
    async fn sign_in_anonymously(&self) -> Result<Session, AppError> {
        Ok(Self::mint(Uuid::new_v4().to_string()))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        Ok(Self::mint(refresh_token.to_string()))
    }

    async fn send_magic_link(&self, _email: &str, _redirect_to: Option<&str>) -> Result<(), AppError> {
        Err(AppError::BadRequest("Magic links are not available offline".to_string()))
    }

    async fn verify_magic_link(&self, _token_hash: &str) -> Result<Session, AppError> {
        Err(AppError::BadRequest("Magic links are not available offline".to_string()))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: Option<i64>) -> Session {
        Session {
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at,
            user: SessionUser {
                id: "u1".to_string(),
                email: None,
                is_anonymous: true,
            },
        }
    }

    #[test]
    fn test_freshness_uses_margin() {
        assert!(session(None).is_fresh_at(1_000));
        assert!(session(Some(1_100)).is_fresh_at(1_000));
        assert!(!session(Some(1_050)).is_fresh_at(1_000));
    }

    #[test]
    fn test_session_mode_parse() {
        assert_eq!(SessionMode::parse("anonymous"), Some(SessionMode::Anonymous));
        assert_eq!(SessionMode::parse(" Magic-Link "), Some(SessionMode::MagicLink));
        assert_eq!(SessionMode::parse("password"), None);
    }

    #[tokio::test]
    async fn test_offline_auth_provisions_anonymous_session() {
        let manager = SessionManager::new(Arc::new(OfflineAuth), SessionMode::Anonymous);
        let first = manager.ensure_session().await.expect("session").expect("some");
        assert!(first.user.is_anonymous);
        let second = manager.ensure_session().await.expect("session").expect("some");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_magic_link_mode_has_no_fallback() {
        let manager = SessionManager::new(Arc::new(OfflineAuth), SessionMode::MagicLink);
        assert_eq!(manager.ensure_session().await.expect("no error"), None);
        assert_eq!(manager.require_session().await, Err(AppError::LoginRequired));
    }
}
