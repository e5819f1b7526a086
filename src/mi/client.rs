//! # MI REST Client
//!
//! [`TransactionService`] implementation against the M3 MI REST surface:
//! `GET {base}/M3/m3api-rest/execute/{program}/{transaction}` with the
//! parameter set as query string and a bearer token from the OAuth2
//! password grant.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::MiConfig;
use crate::error::{Result, SparepartError};
use crate::mi::credentials::{find_ionapi_path, IonApiCredentials};
use crate::mi::response::MiResponse;
use crate::mi::TransactionService;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// HTTP client for the MI REST API.
///
/// The token is acquired once at connect time; service-account tokens
/// outlive any single renumbering run. A run that spans a token expiry
/// fails with a `Remote` error on the affected item and can be resumed.
pub struct MiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    timeout: Duration,
}

impl MiClient {
    /// Resolve credentials for the environment, fetch a token and build a
    /// ready-to-use client.
    pub async fn connect(mi: &MiConfig, environment: &str) -> Result<Self> {
        let path = find_ionapi_path(mi, environment)?;
        tracing::debug!(ionapi = %path.display(), environment, "using .ionapi credentials");
        let credentials = IonApiCredentials::load(&path)?;
        Self::connect_with_credentials(mi, &credentials).await
    }

    /// Build a client from already-loaded credentials.
    pub async fn connect_with_credentials(
        mi: &MiConfig,
        credentials: &IonApiCredentials,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(mi.timeout_secs))
            .build()?;

        let access_token = Self::acquire_token(&http, credentials, mi.token_timeout_secs).await?;
        let base_url = credentials.base_url()?;

        Ok(Self {
            http,
            base_url,
            access_token,
            timeout: Duration::from_secs(mi.timeout_secs),
        })
    }

    async fn acquire_token(
        http: &reqwest::Client,
        credentials: &IonApiCredentials,
        timeout_secs: u64,
    ) -> Result<String> {
        let form = [
            ("grant_type", "password"),
            ("username", credentials.saak.as_str()),
            ("password", credentials.sask.as_str()),
        ];

        let response = http
            .post(credentials.token_url())
            .basic_auth(&credentials.ci, Some(&credentials.cs))
            .form(&form)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| SparepartError::infrastructure(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SparepartError::infrastructure(format!(
                "token request rejected: HTTP {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SparepartError::infrastructure(format!("invalid token response: {e}")))?;
        Ok(token.access_token)
    }

    fn execute_url(&self, program: &str, transaction: &str) -> String {
        format!(
            "{}/M3/m3api-rest/execute/{}/{}",
            self.base_url, program, transaction
        )
    }
}

#[async_trait]
impl TransactionService for MiClient {
    async fn call(
        &self,
        program: &str,
        transaction: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<MiResponse> {
        let url = self.execute_url(program, transaction);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SparepartError::remote(program, transaction, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SparepartError::remote(
                program,
                transaction,
                format!("HTTP {status}: {body}"),
            ));
        }

        response
            .json::<MiResponse>()
            .await
            .map_err(|e| SparepartError::remote(program, transaction, format!("invalid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_url_layout() {
        let client = MiClient {
            http: reqwest::Client::new(),
            base_url: "https://api.example/TENANT_X".to_string(),
            access_token: "t".to_string(),
            timeout: Duration::from_secs(60),
        };
        assert_eq!(
            client.execute_url("MOS256MI", "LstAsBuild"),
            "https://api.example/TENANT_X/M3/m3api-rest/execute/MOS256MI/LstAsBuild"
        );
    }
}
