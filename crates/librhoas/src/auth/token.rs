//! Inspection of JWT access and refresh tokens.
//!
//! Signatures are not verified: the tokens come straight from the token
//! endpoint and are only read to decide whether a refresh is needed and to
//! greet the user by name.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

/// Access tokens this close to expiry are treated as already expired.
fn expiry_leeway() -> TimeDelta {
    TimeDelta::seconds(5)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Claims {
    /// Expiry time, if the token carries a non-zero `exp`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp
            .filter(|exp| *exp > 0)
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

/// Decode the payload segment of a JWT. Returns `None` for opaque tokens.
pub fn parse_claims(token: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn username(token: &str) -> Option<String> {
    parse_claims(token)?.preferred_username
}

/// An access token must be refreshed when it is missing, unreadable or
/// about to expire.
pub fn is_access_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    if token.is_empty() {
        return true;
    }
    match parse_claims(token) {
        Some(claims) => claims
            .expires_at()
            .is_some_and(|exp| exp <= now + expiry_leeway()),
        None => true,
    }
}

/// Refresh tokens are only known to be dead when they are JWTs with a past
/// `exp`. Offline tokens carry `exp: 0` or are opaque.
pub fn is_refresh_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    parse_claims(token)
        .and_then(|claims| claims.expires_at())
        .is_some_and(|exp| exp <= now)
}

#[cfg(test)]
pub(crate) fn encode_test_jwt(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_claims() {
        let token = encode_test_jwt(json!({
            "exp": 1_900_000_000,
            "preferred_username": "jdoe",
            "email": "jdoe@example.com"
        }));
        let claims = parse_claims(&token).unwrap();
        assert_eq!(claims.preferred_username.as_deref(), Some("jdoe"));
        assert_eq!(claims.exp, Some(1_900_000_000));
        assert_eq!(username(&token).as_deref(), Some("jdoe"));
    }

    #[test]
    fn test_opaque_tokens() {
        assert!(parse_claims("").is_none());
        assert!(parse_claims("opaque-offline-token").is_none());
        assert!(parse_claims("a.b").is_none());
        assert!(parse_claims("a.!!!.c").is_none());
        assert!(parse_claims("a.b.c.d").is_none());
        assert!(username("opaque").is_none());
    }

    #[test]
    fn test_access_token_expiry() {
        let now = Utc::now();
        let valid = encode_test_jwt(json!({"exp": (now + TimeDelta::hours(1)).timestamp()}));
        let expired = encode_test_jwt(json!({"exp": (now - TimeDelta::hours(1)).timestamp()}));
        let almost = encode_test_jwt(json!({"exp": (now + TimeDelta::seconds(2)).timestamp()}));

        assert!(!is_access_token_expired(&valid, now));
        assert!(is_access_token_expired(&expired, now));
        assert!(is_access_token_expired(&almost, now));
        assert!(is_access_token_expired("", now));
        assert!(is_access_token_expired("opaque", now));
    }

    #[test]
    fn test_refresh_token_expiry() {
        let now = Utc::now();
        let expired = encode_test_jwt(json!({"exp": (now - TimeDelta::hours(1)).timestamp()}));
        let offline = encode_test_jwt(json!({"exp": 0}));

        assert!(is_refresh_token_expired(&expired, now));
        assert!(!is_refresh_token_expired(&offline, now));
        assert!(!is_refresh_token_expired("opaque-offline-token", now));
    }
}
