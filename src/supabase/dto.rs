use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionUser};

/// PostgREST error body.
#[derive(Debug, Deserialize)]
pub struct PostgrestError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl PostgrestError {
    pub fn describe(&self) -> String {
        let mut out = self.message.clone();
        if let Some(code) = &self.code {
            out = format!("{} ({})", out, code);
        }
        if let Some(details) = self.details.as_deref().filter(|d| !d.is_empty()) {
            out = format!("{}: {}", out, details);
        }
        out
    }
}

/// GoTrue error body; older servers use `error_description`, newer `msg`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthError {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AuthError {
    pub fn describe(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// Token grant / sign-up / verify response.
#[derive(Debug, Deserialize)]
pub struct AuthSessionResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSessionResponse {
    pub fn into_session(self, now: i64) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
            user: SessionUser {
                id: self.user.id,
                email: self.user.email.filter(|e| !e.is_empty()),
                is_anonymous: self.user.is_anonymous,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OtpRequest<'a> {
    pub email: &'a str,
    pub create_user: bool,
}

#[derive(Debug, Serialize)]
pub struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub token_hash: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ProjectInsert<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct ProjectRename<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DetachProject {
    pub project_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_response_computes_expiry() {
        let body = serde_json::json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "u1", "is_anonymous": true }
        });
        let parsed: AuthSessionResponse = serde_json::from_value(body).expect("parse");
        let session = parsed.into_session(1_000);
        assert_eq!(session.expires_at, Some(4_600));
        assert_eq!(session.refresh_token.as_deref(), Some("r"));
        assert!(session.user.is_anonymous);
    }

    #[test]
    fn test_auth_error_prefers_msg() {
        let parsed: AuthError =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Token expired"}"#)
                .expect("parse");
        assert_eq!(parsed.describe().as_deref(), Some("Token expired"));
    }

    #[test]
    fn test_postgrest_error_description() {
        let parsed: PostgrestError = serde_json::from_str(
            r#"{"message":"permission denied for table tasks","code":"42501","details":null,"hint":null}"#,
        )
        .expect("parse");
        assert_eq!(parsed.describe(), "permission denied for table tasks (42501)");
    }
}
