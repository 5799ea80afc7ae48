use std::time::Duration;

use crate::{
    Result,
    alias::{UrlAliases, resolve},
    auth::{
        AuthorizationCodeGrant, Browser, PrintUrl, SsoConfig, SystemBrowser, http_client, token,
    },
    config::Config,
    connection::AuthPolicy,
    ctx::Ctx,
    defaults::{
        DEFAULT_CLIENT_ID, DEFAULT_LOGIN_TIMEOUT, DEFAULT_OFFLINE_TOKEN_CLIENT_ID,
        MAS_SSO_REDIRECT_PATH, OFFLINE_TOKEN_URL, SSO_REDIRECT_PATH, default_scopes,
    },
};

pub struct LoginCommandArgs {
    /// API gateway URL or alias
    pub api_gateway: String,
    /// SSO realm URL or alias
    pub auth_url: String,
    /// MAS-SSO realm URL or alias
    pub mas_auth_url: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub insecure: bool,
    pub print_sso_url: bool,
    /// Offline token; skips the browser flow when set
    pub token: Option<String>,
}

impl Default for LoginCommandArgs {
    fn default() -> Self {
        Self {
            api_gateway: "production".to_string(),
            auth_url: "production".to_string(),
            mas_auth_url: "production".to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            scopes: default_scopes(),
            insecure: false,
            print_sso_url: false,
            token: None,
        }
    }
}

/// Settings the command line does not expose.
pub struct LoginOptions {
    pub aliases: UrlAliases,
    /// Upper bound for the interactive flow, both domains included
    pub timeout: Duration,
    /// Overrides the browser chosen from `print_sso_url`
    pub browser: Option<Box<dyn Browser>>,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            aliases: UrlAliases::default(),
            timeout: DEFAULT_LOGIN_TIMEOUT,
            browser: None,
        }
    }
}

pub async fn login_command(ctx: &Ctx, args: LoginCommandArgs) -> Result<()> {
    login_with_options(ctx, args, LoginOptions::default()).await
}

pub async fn login_with_options(
    ctx: &Ctx,
    args: LoginCommandArgs,
    options: LoginOptions,
) -> Result<()> {
    let api_url = resolve(&args.api_gateway, &options.aliases.api_gateway)?;
    let auth_url = resolve(&args.auth_url, &options.aliases.auth)?;
    let mas_auth_url = resolve(&args.mas_auth_url, &options.aliases.mas_auth)?;

    // Offline tokens are issued to a different client
    let client_id = if args.token.is_some() && args.client_id == DEFAULT_CLIENT_ID {
        DEFAULT_OFFLINE_TOKEN_CLIENT_ID.to_string()
    } else {
        args.client_id
    };

    if args.token.is_none() && is_ssh_session() {
        tracing::debug!(
            "running over SSH, the browser may not be reachable; use --print-sso-url or log in with an offline token from {OFFLINE_TOKEN_URL}"
        );
    }

    let store = ctx.store();
    let mut config = store.load_or_init()?;
    config.api_url = trimmed(&api_url);
    config.auth_url = trimmed(&auth_url);
    config.mas_auth_url = trimmed(&mas_auth_url);
    config.client_id = client_id.clone();
    config.scopes = args.scopes.clone();
    config.insecure = args.insecure;

    let config = match args.token {
        Some(offline_token) => {
            config.refresh_token = offline_token;
            config.access_token.clear();
            config.mas_access_token.clear();
            config.mas_refresh_token.clear();

            // The empty access token forces one refresh, which also saves
            ctx.connection_factory()
                .connect(config, AuthPolicy::RequirePrimaryOnly)
                .await?
                .into_config()
        }
        None => {
            let browser = options.browser.unwrap_or_else(|| -> Box<dyn Browser> {
                if args.print_sso_url {
                    Box::new(PrintUrl::new(ctx.output.clone()))
                } else {
                    Box::new(SystemBrowser::new(ctx.output.clone()))
                }
            });
            let grant = AuthorizationCodeGrant::new(
                http_client(args.insecure)?,
                client_id,
                args.scopes,
                browser,
            );

            let sso = SsoConfig::new(auth_url, SSO_REDIRECT_PATH);
            let mas_sso = SsoConfig::new(mas_auth_url, MAS_SSO_REDIRECT_PATH);
            grant
                .execute(&mut config, &sso, Some(&mas_sso), options.timeout)
                .await?;

            store.save(&config)?;
            config
        }
    };

    report_success(ctx, &config)
}

fn report_success(ctx: &Ctx, config: &Config) -> Result<()> {
    let username = token::username(&config.access_token);
    tracing::info!(api_url = %config.api_url, "login complete");

    if ctx.output.json {
        ctx.output.json_value(&serde_json::json!({
            "username": username,
            "api_url": config.api_url,
        }))?;
        return Ok(());
    }

    match username {
        Some(username) => ctx
            .output
            .success(format!("You are now logged in as \"{username}\""))?,
        None => ctx.output.success("You are now logged in")?,
    }
    Ok(())
}

fn trimmed(url: &url::Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

fn is_ssh_session() -> bool {
    ["SSH_CLIENT", "SSH_TTY", "SSH_CONNECTION"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}
