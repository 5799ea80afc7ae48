use serde::Serialize;

use crate::{
    Result,
    api::Instance,
    auth::token,
    config::{Config, ServiceBookmarks, ServiceKind, ServiceRef},
    connection::AuthPolicy,
    ctx::Ctx,
    service::status_messages,
};

const LABEL_WIDTH: usize = 14;

/// Login state of one auth domain, read from its stored tokens.
#[derive(Debug, Clone, Serialize)]
pub struct DomainStatus {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl DomainStatus {
    fn new(access_token: &str, refresh_token: &str) -> Self {
        let claims = token::parse_claims(access_token);
        Self {
            logged_in: !access_token.is_empty() || !refresh_token.is_empty(),
            username: claims.as_ref().and_then(|c| c.preferred_username.clone()),
            expires_at: claims
                .and_then(|c| c.expires_at())
                .map(|t| t.to_rfc3339()),
        }
    }

    fn describe(&self) -> String {
        if !self.logged_in {
            return "not logged in".to_string();
        }
        match (&self.username, &self.expires_at) {
            (Some(user), Some(at)) => format!("logged in as {user} (token expires {at})"),
            (Some(user), None) => format!("logged in as {user}"),
            _ => "logged in".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub api_url: String,
    pub sso: DomainStatus,
    pub mas_sso: DomainStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka: Option<Instance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_registry: Option<Instance>,
    /// Bookmarks left after stale ones were cleared.
    #[serde(skip)]
    pub bookmarks: ServiceBookmarks,
}

impl StatusReport {
    fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.api_url.clone(),
            sso: DomainStatus::new(&config.access_token, &config.refresh_token),
            mas_sso: DomainStatus::new(&config.mas_access_token, &config.mas_refresh_token),
            kafka: None,
            service_registry: None,
            bookmarks: config.services.clone(),
        }
    }

    fn bookmark(&self, kind: ServiceKind) -> Option<&ServiceRef> {
        match kind {
            ServiceKind::Kafka => self.bookmarks.kafka.as_ref(),
            ServiceKind::ServiceRegistry => self.bookmarks.service_registry.as_ref(),
        }
    }
}

/// Show the login state of both domains and the bookmarked instances.
pub async fn status_command(ctx: &Ctx) -> Result<()> {
    let report = status_report(ctx).await?;
    if ctx.output.json {
        ctx.output.json_value(&report)?;
        return Ok(());
    }
    print_report(ctx, &report)
}

/// Collect the status, fetching bookmarked instances when logged in. A
/// bookmark whose instance is gone is cleared from the config.
pub async fn status_report(ctx: &Ctx) -> Result<StatusReport> {
    let config = ctx.store().load_or_init()?;

    let has_bookmarks =
        config.services.kafka.is_some() || config.services.service_registry.is_some();
    if !config.has_primary_credentials() || !has_bookmarks {
        return Ok(StatusReport::from_config(&config));
    }

    let connection = ctx
        .connection_factory()
        .obtain(AuthPolicy::RequirePrimaryOnly)
        .await?;
    let api = connection.api()?;
    // The connection may have refreshed the tokens
    let mut config = connection.into_config();
    let mut report = StatusReport::from_config(&config);

    let mut stale = false;
    for kind in [ServiceKind::Kafka, ServiceKind::ServiceRegistry] {
        let Some(bookmark) = config.bookmark(kind).cloned() else {
            continue;
        };

        let fetched = api
            .service(kind.into())
            .get(&bookmark.instance_id)
            .execute()
            .await;
        match fetched {
            Ok((instance, _)) => match kind {
                ServiceKind::Kafka => report.kafka = Some(instance),
                ServiceKind::ServiceRegistry => report.service_registry = Some(instance),
            },
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    id = %bookmark.instance_id,
                    "bookmarked instance no longer exists"
                );
                ctx.output.warn(format!(
                    "{} \"{}\" no longer exists and has been unset",
                    kind.display_name(),
                    bookmark.name
                ))?;
                stale |= config.clear_bookmark_if(kind, &bookmark.instance_id);
            }
            Err(e) => return Err(e.into_error(status_messages(kind))),
        }
    }

    if stale {
        ctx.store().save(&config)?;
    }
    report.bookmarks = config.services;
    Ok(report)
}

fn print_report(ctx: &Ctx, report: &StatusReport) -> Result<()> {
    let output = &ctx.output;
    output.heading("Status")?;
    output.kv(
        "API URL",
        if report.api_url.is_empty() {
            "-"
        } else {
            report.api_url.as_str()
        },
        LABEL_WIDTH,
    )?;
    output.kv("SSO", report.sso.describe(), LABEL_WIDTH)?;
    output.kv("MAS-SSO", report.mas_sso.describe(), LABEL_WIDTH)?;

    for (kind, instance) in [
        (ServiceKind::Kafka, &report.kafka),
        (ServiceKind::ServiceRegistry, &report.service_registry),
    ] {
        let Some(instance) = instance else {
            let selected = match report.bookmark(kind) {
                Some(bookmark) => format!("{} ({})", bookmark.name, bookmark.instance_id),
                None => "none selected".to_string(),
            };
            output.kv(kind.display_name(), selected, LABEL_WIDTH)?;
            continue;
        };

        output.text("")?;
        output.heading(kind.display_name())?;
        output.kv("ID", &instance.id, LABEL_WIDTH)?;
        output.kv("Name", &instance.name, LABEL_WIDTH)?;
        if let Some(status) = &instance.status {
            output.kv("Status", status, LABEL_WIDTH)?;
        }
        if let Some(owner) = &instance.owner {
            output.kv("Owner", owner, LABEL_WIDTH)?;
        }
        if let Some(endpoint) = &instance.endpoint {
            output.kv("Endpoint", endpoint, LABEL_WIDTH)?;
        }
    }
    Ok(())
}
