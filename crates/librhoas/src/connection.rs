//! Authenticated connections to the management APIs.
//!
//! A [`Connection`] is built once per command. Building it checks that the
//! configuration holds credentials for every auth domain the command needs,
//! refreshes stale access tokens once and writes the refreshed tokens back to
//! the config file. It never refreshes again afterwards.

use chrono::Utc;
use url::Url;

use crate::{
    Error, Result,
    api::Api,
    auth::{
        Tokens, http_client, refresh_tokens, token::is_access_token_expired,
        token::is_refresh_token_expired, token_endpoint,
    },
    config::{Config, ConfigStore, StorageError},
};

/// Which auth domains a command needs tokens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    RequirePrimaryOnly,
    RequirePrimaryAndSecondary,
}

impl AuthPolicy {
    fn requires_secondary(&self) -> bool {
        matches!(self, AuthPolicy::RequirePrimaryAndSecondary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Primary,
    Secondary,
}

impl Domain {
    fn name(&self) -> &'static str {
        match self {
            Domain::Primary => "SSO",
            Domain::Secondary => "MAS-SSO",
        }
    }

    fn tokens<'a>(&self, config: &'a Config) -> (&'a str, &'a str) {
        match self {
            Domain::Primary => (&config.access_token, &config.refresh_token),
            Domain::Secondary => (&config.mas_access_token, &config.mas_refresh_token),
        }
    }

    fn auth_url<'a>(&self, config: &'a Config) -> &'a str {
        match self {
            Domain::Primary => &config.auth_url,
            Domain::Secondary => &config.mas_auth_url,
        }
    }

    fn store(&self, config: &mut Config, tokens: Tokens) {
        match self {
            Domain::Primary => {
                config.access_token = tokens.access_token;
                config.refresh_token = tokens.refresh_token;
            }
            Domain::Secondary => {
                config.mas_access_token = tokens.access_token;
                config.mas_refresh_token = tokens.refresh_token;
            }
        }
    }
}

pub struct ConnectionFactory {
    store: ConfigStore,
    force_refresh: bool,
}

impl ConnectionFactory {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            store,
            force_refresh: false,
        }
    }

    /// Refresh the access tokens even if they have not expired.
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Load the configuration and connect with it. A missing config file
    /// means nobody has logged in yet.
    pub async fn obtain(&self, policy: AuthPolicy) -> Result<Connection> {
        let config = match self.store.load() {
            Ok(config) => config,
            Err(StorageError::NotFound(_)) => Config::default(),
            Err(e) => return Err(e.into()),
        };
        self.connect(config, policy).await
    }

    /// Connect with an in-memory configuration, saving it if tokens were
    /// refreshed.
    pub async fn connect(&self, mut config: Config, policy: AuthPolicy) -> Result<Connection> {
        let domains: &[Domain] = if policy.requires_secondary() {
            &[Domain::Primary, Domain::Secondary]
        } else {
            &[Domain::Primary]
        };

        let now = Utc::now();
        for domain in domains {
            check_credentials(&config, *domain, now)?;
        }

        let http = http_client(config.insecure)?;
        let mut refreshed = false;
        for domain in domains {
            let (access_token, refresh_token) = domain.tokens(&config);
            if !self.force_refresh && !is_access_token_expired(access_token, now) {
                continue;
            }

            let refresh_token = refresh_token.to_string();
            let token_url = realm_token_endpoint(domain.auth_url(&config), *domain)?;
            let tokens =
                match refresh_tokens(&http, &token_url, &config.client_id, &refresh_token).await {
                    Ok(tokens) => tokens,
                    Err(e) => {
                        // Earlier domains may have rotated their refresh tokens
                        if refreshed {
                            self.store.save(&config)?;
                        }
                        return Err(Error::NotLoggedIn(format!(
                            "Your {} session could not be renewed ({e})",
                            domain.name()
                        )));
                    }
                };
            domain.store(&mut config, tokens);
            refreshed = true;
        }

        if refreshed {
            self.store.save(&config)?;
            tracing::debug!(path = %self.store.path().display(), "saved refreshed tokens");
        }

        Ok(Connection { config, http })
    }
}

fn check_credentials(config: &Config, domain: Domain, now: chrono::DateTime<Utc>) -> Result<()> {
    let (access_token, refresh_token) = domain.tokens(config);

    if access_token.is_empty() && refresh_token.is_empty() {
        return Err(Error::NotLoggedIn(format!(
            "You are not logged in to {}",
            domain.name()
        )));
    }

    if refresh_token.is_empty() {
        if is_access_token_expired(access_token, now) {
            return Err(Error::NotLoggedIn(format!(
                "Your {} session has expired",
                domain.name()
            )));
        }
    } else if is_refresh_token_expired(refresh_token, now) {
        return Err(Error::NotLoggedIn(format!(
            "Your {} session has expired",
            domain.name()
        )));
    }

    Ok(())
}

fn realm_token_endpoint(auth_url: &str, domain: Domain) -> Result<String> {
    let url = Url::parse(auth_url).map_err(|_| {
        Error::NotLoggedIn(format!(
            "No valid {} URL is configured ('{auth_url}')",
            domain.name()
        ))
    })?;
    Ok(token_endpoint(&url))
}

/// An authenticated session for one command invocation.
pub struct Connection {
    config: Config,
    http: reqwest::Client,
}

impl Connection {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    pub fn access_token(&self) -> &str {
        &self.config.access_token
    }

    pub fn mas_access_token(&self) -> &str {
        &self.config.mas_access_token
    }

    /// Typed clients for the management APIs.
    pub fn api(&self) -> Result<Api> {
        let base_url = Url::parse(&self.config.api_url).map_err(|e| {
            Error::Other(format!(
                "invalid API URL '{}' in configuration: {e}",
                self.config.api_url
            ))
        })?;
        Ok(Api::new(
            self.http.clone(),
            base_url,
            self.config.access_token.clone(),
        ))
    }
}
