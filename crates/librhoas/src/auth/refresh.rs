use oauth2::basic::BasicClient;
use oauth2::{ClientId, RefreshToken, TokenUrl};

use super::{Tokens, describe_token_error};
use crate::{Error, Result};

/// Exchange `refresh_token` for a new token pair at `token_url`.
///
/// Providers that do not rotate refresh tokens answer without one; the
/// returned pair then keeps the token that was sent.
pub async fn refresh_tokens(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<Tokens> {
    let client = BasicClient::new(ClientId::new(client_id.to_string())).set_token_uri(
        TokenUrl::new(token_url.to_string())
            .map_err(|e| Error::Other(format!("Invalid token URL: {e}")))?,
    );

    tracing::debug!(token_url, "refreshing access token");
    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
        .request_async(http)
        .await
        .map_err(|e| Error::Remote(format!("token refresh failed: {}", describe_token_error(e))))?;

    let mut tokens = Tokens::from_response(&response);
    tracing::debug!(expires_in = ?tokens.expires_in, "access token refreshed");
    if tokens.refresh_token.is_empty() {
        tokens.refresh_token = refresh_token.to_string();
    }
    Ok(tokens)
}
