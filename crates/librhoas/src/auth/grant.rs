//! Interactive authorization code grant (RFC 6749 §4.1, with PKCE).
//!
//! Each SSO domain goes through the same sequence: discover the provider,
//! start the loopback listener, send the user to the authorization endpoint,
//! wait for the redirect, validate it and exchange the code. Domains are
//! processed one after the other and all of them share one deadline.

use std::future::Future;
use std::time::Duration;

use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, CsrfToken, PkceCodeChallenge, RedirectUrl, Scope,
    TokenUrl,
};
use tokio::time::Instant;

use super::{
    Browser, CallbackListener, CallbackParams, SsoConfig, Tokens, describe_token_error, discover,
};
use crate::{Error, Result, config::Config};

pub struct AuthorizationCodeGrant {
    http: reqwest::Client,
    client_id: String,
    scopes: Vec<String>,
    browser: Box<dyn Browser>,
}

impl AuthorizationCodeGrant {
    pub fn new(
        http: reqwest::Client,
        client_id: impl Into<String>,
        scopes: Vec<String>,
        browser: Box<dyn Browser>,
    ) -> Self {
        Self {
            http,
            client_id: client_id.into(),
            scopes,
            browser,
        }
    }

    /// Log in to `sso`, then to `mas_sso` if given, and record the tokens in
    /// `config`. Nothing is persisted here. The whole sequence must finish
    /// within `timeout`.
    pub async fn execute(
        &self,
        config: &mut Config,
        sso: &SsoConfig,
        mas_sso: Option<&SsoConfig>,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;

        let tokens = self.login(sso, deadline).await?;
        config.access_token = tokens.access_token;
        config.refresh_token = tokens.refresh_token;

        if let Some(mas_sso) = mas_sso {
            let tokens = self.login(mas_sso, deadline).await?;
            config.mas_access_token = tokens.access_token;
            config.mas_refresh_token = tokens.refresh_token;
        }

        Ok(())
    }

    /// Run the grant against one domain.
    pub async fn login(&self, sso: &SsoConfig, deadline: Instant) -> Result<Tokens> {
        tracing::debug!(auth_url = %sso.auth_url, "starting authorization code grant");
        let metadata = within(deadline, discover(&self.http, &sso.auth_url)).await?;

        let mut listener = CallbackListener::bind(&sso.redirect_path).await?;
        let result = self
            .authorize(
                &metadata.authorization_endpoint,
                &metadata.token_endpoint,
                &mut listener,
                deadline,
            )
            .await;
        listener.shutdown().await;

        result
    }

    async fn authorize(
        &self,
        authorization_endpoint: &str,
        token_endpoint: &str,
        listener: &mut CallbackListener,
        deadline: Instant,
    ) -> Result<Tokens> {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_auth_uri(
                AuthUrl::new(authorization_endpoint.to_string())
                    .map_err(|e| Error::Remote(format!("invalid authorization endpoint: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(token_endpoint.to_string())
                    .map_err(|e| Error::Remote(format!("invalid token endpoint: {e}")))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(listener.redirect_uri())
                    .map_err(|e| Error::Internal(format!("invalid redirect URL: {e}")))?,
            );

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (authorize_url, state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge)
            .url();

        self.browser.open(&authorize_url)?;

        let params = within(deadline, listener.wait()).await?;
        let code = validate_callback(params, state.secret())?;
        tracing::debug!("authorization code received, exchanging for tokens");

        let response = within(deadline, async {
            client
                .exchange_code(AuthorizationCode::new(code))
                .set_pkce_verifier(pkce_verifier)
                .request_async(&self.http)
                .await
                .map_err(|e| {
                    Error::Remote(format!("token exchange failed: {}", describe_token_error(e)))
                })
        })
        .await?;

        Ok(Tokens::from_response(&response))
    }
}

/// Check a redirect against the `state` we sent and extract the code.
///
/// The state is checked before anything else so a forged redirect never gets
/// its error or code looked at.
pub fn validate_callback(params: CallbackParams, expected_state: &str) -> Result<String> {
    if params.state.as_deref() != Some(expected_state) {
        return Err(Error::StateMismatch);
    }

    if let Some(error) = params.error {
        return Err(Error::AuthorizationDenied {
            description: params
                .error_description
                .unwrap_or_else(|| "no description provided".to_string()),
            error,
        });
    }

    params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| Error::AuthorizationDenied {
            error: "missing_code".to_string(),
            description: "the callback did not include an authorization code".to_string(),
        })
}

async fn within<T>(deadline: Instant, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| Error::DeadlineExceeded)?
}
