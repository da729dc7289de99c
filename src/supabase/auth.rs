use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::{error, info};

use crate::error::AppError;
use crate::session::{AuthProvider, Session};
use crate::supabase::SupabaseConfig;
use crate::supabase::build_client;
use crate::supabase::dto::{
    AuthError, AuthSessionResponse, OtpRequest, RefreshTokenRequest, VerifyRequest,
};

/// GoTrue client for the hosted auth service.
pub struct SupabaseAuth {
    client: Client,
    config: SupabaseConfig,
}

impl SupabaseAuth {
    pub fn new(config: SupabaseConfig) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client()?,
            config,
        })
    }

    fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        body: &B,
    ) -> Result<RequestBuilder, AppError> {
        let mut url = self.config.auth_url(path)?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(self
            .client
            .post(url)
            .header("apikey", &self.config.anon_key)
            .json(body))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, AppError> {
        let response = builder.send().await.map_err(|e| AppError::Session(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AuthError>(&body)
            .ok()
            .and_then(AuthError::describe)
            .unwrap_or_else(|| format!("Auth error {}: {}", status, body));
        error!("auth request failed: {}", message);
        Err(AppError::Session(message))
    }

    async fn session(&self, builder: RequestBuilder) -> Result<Session, AppError> {
        let response = self.send(builder).await?;
        let body = response.text().await.map_err(|e| AppError::Session(e.to_string()))?;
        let parsed: AuthSessionResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Session(format!("Failed to parse auth response: {}", e)))?;
        Ok(parsed.into_session(Utc::now().timestamp()))
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_in_anonymously(&self) -> Result<Session, AppError> {
        let builder = self.post("signup", &[], &serde_json::json!({}))?;
        self.session(builder).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AppError> {
        let builder = self.post(
            "token",
            &[("grant_type", "refresh_token")],
            &RefreshTokenRequest { refresh_token },
        )?;
        self.session(builder).await
    }

    async fn send_magic_link(&self, email: &str, redirect_to: Option<&str>) -> Result<(), AppError> {
        let params: Vec<(&str, &str)> = redirect_to
            .map(|to| vec![("redirect_to", to)])
            .unwrap_or_default();
        let builder = self.post(
            "otp",
            &params,
            &OtpRequest {
                email,
                create_user: true,
            },
        )?;
        self.send(builder).await?;
        info!("magic link sent");
        Ok(())
    }

    async fn verify_magic_link(&self, token_hash: &str) -> Result<Session, AppError> {
        let builder = self.post(
            "verify",
            &[],
            &VerifyRequest {
                kind: "magiclink",
                token_hash,
            },
        )?;
        self.session(builder).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AppError> {
        let builder = self
            .post("logout", &[], &serde_json::json!({}))?
            .header("Authorization", format!("Bearer {}", access_token));
        self.send(builder).await?;
        Ok(())
    }
}
