//! Scriba blog server
//!
//! Serves the public blog and the authoring dashboard, and provides
//! administrative commands.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use scriba_kernel::error::ServiceError;
use scriba_kernel::{AppState, Config, routes, session};

#[derive(Parser)]
#[command(name = "scriba", version, about = "Scriba multi-user blog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create an active staff superuser.
    CreateSuperuser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SCRIBA_SUPERUSER_PASSWORD")]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();

    let config = Config::from_env().context("failed to load configuration")?;
    info!(port = config.port, "Configuration loaded");

    let state = AppState::new(&config)
        .await
        .context("failed to initialize application state")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, state).await,
        Command::CreateSuperuser {
            username,
            email,
            password,
        } => create_superuser(&state, &username, &email, &password).await,
    }
}

async fn serve(config: &Config, state: AppState) -> Result<()> {
    info!("Starting Scriba");

    let session_layer = session::create_session_layer(
        &config.redis_url,
        &config.cookie_same_site,
        config.cookie_secure,
    )
    .await
    .context("failed to create session layer")?;

    // TraceLayer → session → routes
    let app = routes::router()
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;

    info!(%addr, "Server listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn create_superuser(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    match state
        .accounts()
        .create_superuser(username, email, password)
        .await
    {
        Ok(user) => {
            info!(user_id = %user.id, username = %user.username, "Superuser created");
            Ok(())
        }
        Err(ServiceError::Validation(errors)) => {
            anyhow::bail!("cannot create superuser: {}", errors.join(" "))
        }
        Err(e) => Err(anyhow::anyhow!(e)).context("failed to create superuser"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
