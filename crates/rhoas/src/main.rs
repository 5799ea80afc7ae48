use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use librhoas::{
    LogLevel, Result,
    config::{ConfigStore, ServiceKind},
    ctx::{self, Ctx},
    defaults::DEFAULT_CLIENT_ID,
    login,
    output::{Output, format_root_error},
    service::{self, InstanceSelector},
    session, status,
};
use terminal_size::{Width, terminal_size};

#[derive(Args)]
#[group(required = true, multiple = false)]
struct UseArgs {
    /// Unique ID of the instance
    #[arg(long)]
    id: Option<String>,

    /// Name of the instance
    #[arg(long)]
    name: Option<String>,
}

impl UseArgs {
    fn selector(self) -> Option<InstanceSelector> {
        match (self.id, self.name) {
            (Some(id), _) => Some(InstanceSelector::Id(id)),
            (None, Some(name)) => Some(InstanceSelector::Name(name)),
            (None, None) => None,
        }
    }
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// Set the current instance used by other commands
    Use {
        #[command(flatten)]
        args: UseArgs,
    },
}

#[derive(Parser)]
#[command(
    name = "rhoas",
    about = "Manage your application services from the command line",
    version = ctx::VERSION,
)]
struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Enable logging with specified level
    #[arg(long, global = true, value_enum)]
    logs: Option<LogLevel>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Force color output
    #[arg(long, global = true, conflicts_with = "no_color")]
    color: bool,

    /// Disable color output
    #[arg(long, global = true, conflicts_with = "color")]
    no_color: bool,

    /// Path of the configuration file
    #[arg(long, global = true, env = "RHOASCONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the rhoas build version
    Version,

    /// Log in to the API gateway and both SSO domains
    Login {
        /// API gateway URL or alias ("production", "staging")
        #[arg(long, default_value = "production")]
        api_gateway: String,

        /// SSO realm URL or alias
        #[arg(long, default_value = "production")]
        auth_url: String,

        /// MAS-SSO realm URL or alias
        #[arg(long, default_value = "production")]
        mas_auth_url: String,

        /// OAuth client ID
        #[arg(long, default_value = DEFAULT_CLIENT_ID)]
        client_id: String,

        /// OAuth scope to request (repeatable)
        #[arg(long = "scope", default_value = "openid")]
        scopes: Vec<String>,

        /// Skip TLS certificate verification
        #[arg(long)]
        insecure: bool,

        /// Print the login URL instead of opening a browser
        #[arg(long)]
        print_sso_url: bool,

        /// Log in with an offline token instead of the browser flow
        #[arg(long, short = 't')]
        token: Option<String>,
    },

    /// Forget the stored tokens
    Logout,

    /// Print the name of the logged in user
    Whoami,

    /// Print a valid access token
    Authtoken,

    /// Show the login state and the current instances
    Status,

    /// Kafka instance commands
    Kafka {
        #[command(subcommand)]
        command: ServiceCommands,
    },

    /// Service Registry instance commands
    #[command(alias = "service-registry")]
    Registry {
        #[command(subcommand)]
        command: ServiceCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Determine color output preference
    let color = if cli.no_color {
        false
    } else if cli.color {
        true
    } else {
        atty::is(atty::Stream::Stdout)
    };

    // Detect terminal width, default to 80
    let width = if let Some((Width(w), _)) = terminal_size() {
        w as usize
    } else {
        80
    };

    let logs = cli.logs.or(cli.verbose.then_some(LogLevel::Debug));
    let output = Output::new(color, width)
        .with_json(cli.json)
        .with_logging(logs);

    if let Err(e) = run(cli, output.clone()).await {
        tracing::debug!(error = ?e, "command failed");
        let _ = output.error(format_root_error(&e.to_string()));
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => ConfigStore::default_path()?,
    };
    let ctx = Ctx {
        config_path,
        output,
    };

    match cli.command {
        Commands::Version => {
            ctx.output.text(format!("rhoas version {}", ctx::VERSION))?;
        }

        Commands::Login {
            api_gateway,
            auth_url,
            mas_auth_url,
            client_id,
            scopes,
            insecure,
            print_sso_url,
            token,
        } => {
            let args = login::LoginCommandArgs {
                api_gateway,
                auth_url,
                mas_auth_url,
                client_id,
                scopes,
                insecure,
                print_sso_url,
                token,
            };
            login::login_command(&ctx, args).await?;
        }

        Commands::Logout => session::logout_command(&ctx).await?,
        Commands::Whoami => session::whoami_command(&ctx).await?,
        Commands::Authtoken => session::authtoken_command(&ctx).await?,
        Commands::Status => status::status_command(&ctx).await?,

        Commands::Kafka { command } => use_instance(&ctx, ServiceKind::Kafka, command).await?,
        Commands::Registry { command } => {
            use_instance(&ctx, ServiceKind::ServiceRegistry, command).await?
        }
    }

    Ok(())
}

async fn use_instance(ctx: &Ctx, kind: ServiceKind, command: ServiceCommands) -> Result<()> {
    match command {
        ServiceCommands::Use { args } => {
            let selector = args
                .selector()
                .ok_or("one of --id or --name is required")?;
            service::use_command(ctx, kind, selector).await
        }
    }
}
