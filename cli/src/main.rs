use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use sessiongate::{
    App, ClientConfig, ConfigError, Credentials, FileStore, Navigation, Notice, NoticeLevel, Notifier,
    RequestDescriptor, TransportError, Verdict,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Auth(#[from] sessiongate::AuthError),
    #[error("{0}")]
    Api(#[from] sessiongate::ApiError),
    #[error("not signed in; run `sessiongate login` first")]
    NotSignedIn,
    #[error("invalid query pair `{0}`; expected key=value")]
    InvalidQuery(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sessiongate", about = "Document manager session and API CLI")]
struct Cli {
    #[arg(long, env = "API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session.
    Login {
        username: String,
        #[arg(long, env = "SESSIONGATE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the persisted session.
    Logout,
    /// Show whether a session is persisted.
    Status,
    /// Fetch the signed-in user from the backend.
    Whoami,
    /// GET an API path with the session's credentials.
    Get {
        path: String,
        #[arg(long = "query", short = 'q', help = "Query parameter as key=value; repeatable")]
        query: Vec<String>,
    },
    /// Show where navigating to a route would land.
    Route { path: String },
}

/// Prints notices on stderr so stdout stays machine-readable.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let label = match notice.level {
            NoticeLevel::Error => "error",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Info => "info",
        };
        eprintln!("{label}: {}", notice.text);
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(session_file) = cli.session_file {
        config.session_file = session_file;
    }

    let mirror = Arc::new(FileStore::new(config.session_file.clone()));
    let app = App::connect(config, mirror, Arc::new(ConsoleNotifier))?;

    match cli.command {
        Command::Login { username, password } => run_login(&app, username, password).await,
        Command::Logout => {
            app.auth().logout();
            ConsoleNotifier.notify(Notice::info("signed out"));
            Ok(())
        }
        Command::Status => {
            run_status(&app);
            Ok(())
        }
        Command::Whoami => run_whoami(&app).await,
        Command::Get { path, query } => run_get(&app, &path, &query).await,
        Command::Route { path } => {
            run_route(&app, &path);
            Ok(())
        }
    }
}

async fn run_login(app: &App, username: String, password: String) -> Result<(), CliError> {
    let user = app.auth().login(&Credentials { username, password }).await?;
    ConsoleNotifier.notify(Notice::info(format!("signed in as {}", user.username)));
    Ok(())
}

fn run_status(app: &App) {
    match app.session().user() {
        Some(user) if app.session().is_authenticated() => {
            let roles: Vec<&str> = user.roles.iter().map(String::as_str).collect();
            println!("signed in as {} (id {}, roles: {})", user.username, user.id, roles.join(", "));
        }
        _ => println!("signed out"),
    }
}

async fn run_whoami(app: &App) -> Result<(), CliError> {
    if !app.session().is_authenticated() {
        return Err(CliError::NotSignedIn);
    }
    let user = app.auth().current_user().await?;
    print_json(&serde_json::to_value(&user)?)
}

async fn run_get(app: &App, path: &str, query: &[String]) -> Result<(), CliError> {
    let mut request = RequestDescriptor::get(path);
    for pair in query {
        let (key, value) = parse_query_pair(pair)?;
        request = request.query(key, value);
    }
    let payload = app.pipeline().send(request).await?;
    print_json(&payload)
}

fn run_route(app: &App, path: &str) {
    let guard = app.router().guard();
    match guard.routes().resolve(path) {
        Some(found) => println!(
            "route {} ({}), requires auth: {}",
            found.path,
            found.name.as_deref().unwrap_or("unnamed"),
            found.requires_auth
        ),
        None => println!("no route matches {path}"),
    }
    match guard.evaluate(path) {
        Verdict::Proceed => {}
        Verdict::Redirect(to) => println!("guard redirects to {to}"),
    }
    match app.router().navigate(path) {
        Navigation::Committed(at) | Navigation::Unchanged(at) => println!("lands on {at}"),
        Navigation::Redirected { to, .. } => println!("lands on {to}"),
    }
}

fn parse_query_pair(pair: &str) -> Result<(&str, &str), CliError> {
    pair.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| CliError::InvalidQuery(pair.to_owned()))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
