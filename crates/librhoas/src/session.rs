//! Commands that inspect or end the current login.

use crate::{Error, Result, auth::token, connection::AuthPolicy, ctx::Ctx};

/// Forget the tokens of both domains. Endpoints and bookmarks are kept so the
/// next login goes to the same environment.
pub async fn logout_command(ctx: &Ctx) -> Result<()> {
    let store = ctx.store();
    let mut config = store.load_or_init()?;
    if !config.has_primary_credentials() && !config.has_mas_credentials() {
        ctx.output.text("You are not logged in")?;
        return Ok(());
    }

    config.clear_tokens();
    store.save(&config)?;
    tracing::debug!(path = %store.path().display(), "cleared stored tokens");

    ctx.output.success("You have been logged out")?;
    Ok(())
}

pub async fn whoami_command(ctx: &Ctx) -> Result<()> {
    let connection = ctx
        .connection_factory()
        .obtain(AuthPolicy::RequirePrimaryOnly)
        .await?;

    let username = token::username(connection.access_token())
        .ok_or_else(|| Error::Other("the access token does not name a user".to_string()))?;

    if ctx.output.json {
        ctx.output
            .json_value(&serde_json::json!({ "username": username }))?;
    } else {
        ctx.output.text(username)?;
    }
    Ok(())
}

/// Print a valid access token, refreshing it first if needed.
pub async fn authtoken_command(ctx: &Ctx) -> Result<()> {
    let connection = ctx
        .connection_factory()
        .obtain(AuthPolicy::RequirePrimaryOnly)
        .await?;

    if ctx.output.json {
        ctx.output.json_value(&serde_json::json!({
            "access_token": connection.access_token(),
        }))?;
    } else {
        ctx.output.text(connection.access_token())?;
    }
    Ok(())
}
