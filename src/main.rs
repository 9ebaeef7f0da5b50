mod api;
mod config;
mod db;
mod models;
mod schema;
mod services;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    // Advisory guard so the periodic status sync and the manual trigger
    // never run interleaved.
    pub sync_guard: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Parser)]
#[command(version, author = "REKLAMO AUTHORS", about = "Reklamo Server\nDigital signage emission scheduling\nLicensed under AGPLv3", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Generate a default configuration template to stdout
    #[arg(long)]
    generate_config: bool,
}

fn run_onboarding() -> Result<()> {
    use dialoguer::{theme::ColorfulTheme, Input};

    println!("Welcome to Reklamo Server!");
    println!("It looks like you don't have a configuration file yet.");
    println!("Let's get you set up.\n");

    let host: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Server Host")
        .default("0.0.0.0".to_string())
        .interact_text()?;

    let port: u16 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Server Port")
        .default(8080)
        .interact_text()?;

    let db_url: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Database URL")
        .default("sqlite://reklamo.db".to_string())
        .interact_text()?;

    let timezone: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Scheduler Timezone (IANA name)")
        .default("Europe/Warsaw".to_string())
        .interact_text()?;

    if timezone.parse::<chrono_tz::Tz>().is_err() {
        anyhow::bail!("Unknown timezone: {}", timezone);
    }

    let config_content = format!(
        r#"[server]
host = "{}"
port = {}

[server.https]
enabled = false
cert_path = "certs/cert.pem"
key_path = "certs/key.pem"

[database]
url = "{}"

[scheduler]
timezone = "{}"
sync_interval_secs = 60
cleanup_interval_secs = 300

[logging]
level = "info"
"#,
        host, port, db_url, timezone
    );

    println!("\nGenerating configuration file: server-config.toml");
    std::fs::write("server-config.toml", &config_content)?;
    println!("Configuration saved successfully!");
    println!("----------------------------------------\n");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", Config::default_template());
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reklamo_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| "server-config.toml".to_string());

    if std::fs::metadata(&config_path).is_err()
        && cli.config.is_none()
        && console::user_attended()
    {
        if let Err(e) = run_onboarding() {
            eprintln!("Onboarding failed: {}", e);
            std::process::exit(1);
        }
    }

    let effective_config_path = if std::fs::metadata(&config_path).is_ok() {
        config_path
    } else if std::fs::metadata("server-config.toml").is_ok() {
        "server-config.toml".to_string()
    } else {
        eprintln!("Error: Configuration file '{}' not found.", config_path);
        eprintln!("Run with --generate-config to see a template.");
        std::process::exit(1);
    };

    let config = Config::load(&effective_config_path)?;
    tracing::info!("Loaded configuration from {}", effective_config_path);

    // Setup database
    let db_pool = db::create_pool(&config.database.url)?;
    db::run_migrations(&mut *db_pool.get()?)?;
    tracing::info!("Database initialized");

    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        sync_guard: Arc::new(tokio::sync::Mutex::new(())),
    };

    // Background jobs: status synchronization, expired-material cleanup,
    // player liveness monitoring.
    tokio::spawn(services::status_sync::run(state.clone()));
    tokio::spawn(services::cleanup_service::run(state.clone()));
    tokio::spawn(services::player_monitor::run(state.clone()));

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let media_path = state.config.media_path().to_string();

    let app = axum::Router::new()
        .nest("/api", api::routes())
        // Material files for the player carousel
        .nest_service("/media", ServeDir::new(&media_path))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener_address: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid host/port: {}", e))?;

    if let Some(https_config) = &config.server.https {
        if https_config.enabled {
            use axum_server::tls_rustls::RustlsConfig;

            tracing::info!("Starting server in HTTPS mode on {}", addr);

            if !std::path::Path::new(&https_config.cert_path).exists() {
                anyhow::bail!("Certificate file not found: {}", https_config.cert_path);
            }
            if !std::path::Path::new(&https_config.key_path).exists() {
                anyhow::bail!("Key file not found: {}", https_config.key_path);
            }

            let tls_config =
                RustlsConfig::from_pem_file(&https_config.cert_path, &https_config.key_path)
                    .await?;

            axum_server::bind_rustls(listener_address, tls_config)
                .serve(app.into_make_service())
                .await?;

            return Ok(());
        }
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {} (HTTP)", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
