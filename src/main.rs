use anyhow::Result;
use apiclient::{commands, config::AppConfig, runtime::RealRuntime};
use clap::{Parser, ValueEnum};
use reqwest::Method;
use std::path::PathBuf;

/// apiclient - talk to a JSON API with your stored session
///
/// Requests carry the stored bearer token. A 401 outside the login flow
/// clears the stored session.
///
/// Examples:
///   apiclient session login --token <TOKEN>
///   apiclient request get /users/5
///   apiclient request post /users --data '{"name":"alice"}'
#[derive(Parser, Debug)]
#[command(author, version = env!("APICLIENT_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding config.json and session.json (also via APICLIENT_CONFIG_DIR)
    #[arg(
        long = "config-dir",
        env = "APICLIENT_CONFIG_DIR",
        value_name = "PATH",
        global = true
    )]
    pub config_dir: Option<PathBuf>,

    /// API base URL (overrides API_BASE_URL and config.json)
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send a request to the API
    Request(RequestArgs),

    /// Manage the stored session
    #[command(subcommand)]
    Session(SessionCommands),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<Verb> for Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct RequestArgs {
    /// HTTP method
    #[arg(value_enum, ignore_case = true)]
    method: Verb,

    /// Path relative to the base URL, or an absolute URL
    path: String,

    /// JSON request body
    #[arg(long, short = 'd', value_name = "JSON")]
    data: Option<String>,

    /// Query parameter, repeatable
    #[arg(long = "query", short = 'q', value_name = "KEY=VALUE", value_parser = parse_key_val)]
    query: Vec<(String, String)>,

    /// Treat a 401 as a rejected login rather than an expired session
    #[arg(long)]
    auth_endpoint: bool,
}

#[derive(clap::Subcommand, Debug)]
enum SessionCommands {
    /// Store a token obtained from the login endpoint
    Login {
        #[arg(long)]
        token: String,

        /// User record as JSON
        #[arg(long, value_name = "JSON")]
        user: Option<String>,
    },

    /// Show the stored session
    Show,

    /// Forget the stored session
    Logout,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;
    let config = AppConfig::resolve(&runtime, cli.config_dir, cli.base_url)?;

    match cli.command {
        Commands::Request(args) => {
            let spec = commands::RequestSpec {
                method: args.method.into(),
                path: args.path,
                data: args.data,
                query: args.query,
                auth_endpoint: args.auth_endpoint,
            };
            commands::request(runtime, &config, &spec).await?
        }
        Commands::Session(SessionCommands::Login { token, user }) => {
            commands::login(runtime, &config.app_dir, &token, user.as_deref())?
        }
        Commands::Session(SessionCommands::Show) => commands::show(runtime, &config.app_dir)?,
        Commands::Session(SessionCommands::Logout) => commands::logout(runtime, &config.app_dir)?,
    }
    Ok(())
}
