use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use agenda::error::AppError;
use agenda::session::{AuthProvider, Session, SessionManager, SessionMode, SessionUser};
use async_trait::async_trait;
use chrono::Utc;

/// Counts calls and can be told to reject the next sign-in.
#[derive(Default)]
struct CountingAuth {
    sign_ins: AtomicUsize,
    refreshes: AtomicUsize,
    sign_outs: AtomicUsize,
    reject_next: Mutex<bool>,
    magic_links: Mutex<Vec<(String, Option<String>)>>,
}

impl CountingAuth {
    fn session(user_id: &str, expires_in: i64) -> Session {
        Session {
            access_token: format!("access-{}", user_id),
            refresh_token: Some(format!("refresh-{}", user_id)),
            expires_at: Some(Utc::now().timestamp() + expires_in),
            user: SessionUser {
                id: user_id.to_string(),
                email: None,
                is_anonymous: true,
            },
        }
    }
}

#[async_trait]
impl AuthProvider for CountingAuth {
    async fn sign_in_anonymously(&self) -> Result<Session, AppError> {
        let n = self.sign_ins.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let reject = std::mem::take(&mut *self.reject_next.lock().unwrap());
        if reject {
            return Err(AppError::Remote("anonymous sign-ins are disabled".to_string()));
        }
        Ok(Self::session(&format!("user-{}", n), 3600))
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if refresh_token == "refresh-revoked" {
            return Err(AppError::Session("Invalid Refresh Token".to_string()));
        }
        let user_id = refresh_token.trim_start_matches("refresh-");
        Ok(Self::session(user_id, 3600))
    }

    async fn send_magic_link(&self, email: &str, redirect_to: Option<&str>) -> Result<(), AppError> {
        self.magic_links
            .lock()
            .unwrap()
            .push((email.to_string(), redirect_to.map(str::to_string)));
        Ok(())
    }

    async fn verify_magic_link(&self, token_hash: &str) -> Result<Session, AppError> {
        if token_hash != "good-hash" {
            return Err(AppError::Remote("Email link is invalid or has expired".to_string()));
        }
        let mut session = Self::session("mailed-user", 3600);
        session.user.is_anonymous = false;
        session.user.email = Some("ada@example.com".to_string());
        Ok(session)
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AppError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn manager(mode: SessionMode) -> (Arc<CountingAuth>, SessionManager) {
    let auth = Arc::new(CountingAuth::default());
    let sessions = SessionManager::new(auth.clone(), mode);
    (auth, sessions)
}

#[tokio::test]
async fn test_concurrent_callers_share_one_sign_in() {
    let (auth, sessions) = manager(SessionMode::Anonymous);

    let (a, b, c) = tokio::join!(
        sessions.ensure_session(),
        sessions.ensure_session(),
        sessions.require_session(),
    );

    let a = a.expect("first").expect("session");
    let b = b.expect("second").expect("session");
    let c = c.expect("third");
    assert_eq!(auth.sign_ins.load(Ordering::SeqCst), 1);
    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[tokio::test]
async fn test_fresh_session_is_reused() {
    let (auth, sessions) = manager(SessionMode::Anonymous);

    let first = sessions.require_session().await.expect("session");
    let second = sessions.require_session().await.expect("session");

    assert_eq!(first, second);
    assert_eq!(auth.sign_ins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejected_sign_in_is_retried_on_next_call() {
    let (auth, sessions) = manager(SessionMode::Anonymous);
    *auth.reject_next.lock().unwrap() = true;

    let err = sessions.ensure_session().await.expect_err("rejected");
    assert!(matches!(err, AppError::Session(_)));
    assert_eq!(sessions.current(), None);

    let session = sessions.require_session().await.expect("retried");
    assert_eq!(session.user.id, "user-2");
    assert_eq!(auth.sign_ins.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_expiring_session_is_refreshed() {
    let (auth, sessions) = manager(SessionMode::Anonymous);
    sessions.set_session(Some(CountingAuth::session("old", 30)));

    let session = sessions.require_session().await.expect("refreshed");

    assert_eq!(session.user.id, "old");
    assert!(session.is_fresh());
    assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(auth.sign_ins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_refresh_falls_back_to_anonymous_sign_in() {
    let (auth, sessions) = manager(SessionMode::Anonymous);
    sessions.set_session(Some(CountingAuth::session("revoked", -10)));

    let session = sessions.require_session().await.expect("new session");

    assert_eq!(session.user.id, "user-1");
    assert_eq!(auth.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(auth.sign_ins.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_magic_link_mode_never_signs_in_anonymously() {
    let (auth, sessions) = manager(SessionMode::MagicLink);

    assert_eq!(sessions.ensure_session().await.expect("no error"), None);
    let err = sessions.require_session().await.expect_err("login required");
    assert_eq!(err, AppError::LoginRequired);
    assert_eq!(auth.sign_ins.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_magic_link_round_trip() {
    let auth = Arc::new(CountingAuth::default());
    let sessions = SessionManager::with_redirect(
        auth.clone(),
        SessionMode::MagicLink,
        Some("http://localhost:3000/auth/callback".to_string()),
    );

    let err = sessions.send_magic_link("   ").await.expect_err("blank");
    assert!(matches!(err, AppError::Validation(_)));

    sessions.send_magic_link(" ada@example.com ").await.expect("sent");
    assert_eq!(
        auth.magic_links.lock().unwrap().as_slice(),
        &[(
            "ada@example.com".to_string(),
            Some("http://localhost:3000/auth/callback".to_string())
        )]
    );

    assert!(sessions.complete_magic_link("stale").await.is_err());
    let session = sessions.complete_magic_link("good-hash").await.expect("verified");
    assert_eq!(session.user.email.as_deref(), Some("ada@example.com"));
    assert_eq!(sessions.current(), Some(session));
}

#[tokio::test]
async fn test_sign_out_clears_local_session() {
    let (auth, sessions) = manager(SessionMode::Anonymous);
    sessions.require_session().await.expect("session");

    sessions.sign_out().await.expect("signed out");

    assert_eq!(sessions.current(), None);
    assert_eq!(auth.sign_outs.load(Ordering::SeqCst), 1);
}
