mod api;
mod auth;
mod config;
mod db;
mod error;
mod models;
mod schema;
mod seeding;
mod services;

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::limiter::LoginLimiter;
use crate::config::{Config, DatabaseConfig, JwtConfig, LoggingConfig, ServerConfig};
use crate::db::{ConnectionOptions, DbPool};

const DEFAULT_CONFIG_PATH: &str = "aulas.toml";

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub login_limiter: Arc<LoginLimiter>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            login_limiter: Arc::new(LoginLimiter::default()),
        }
    }
}

#[derive(Parser)]
#[command(version, author = "AULAS AUTHORS", about = "Aulas Server\nLicensed under AGPLv3\nClassroom assignment per academic period", long_about = None)]
struct Cli {
    /// Path to configuration file [default: aulas.toml]
    #[arg(short, long)]
    config: Option<String>,

    /// Print a configuration template to stdout
    #[arg(long)]
    generate_config: bool,
}

/// Asks for the few settings a fresh install needs and writes them to
/// `DEFAULT_CONFIG_PATH`.
fn run_onboarding() -> Result<Config> {
    use dialoguer::{theme::ColorfulTheme, Input};

    let theme = ColorfulTheme::default();
    println!("No {} found. Let's set up Aulas.\n", DEFAULT_CONFIG_PATH);

    let host: String = Input::with_theme(&theme)
        .with_prompt("Listen address")
        .default("0.0.0.0".to_string())
        .interact_text()?;
    let port: u16 = Input::with_theme(&theme)
        .with_prompt("Port")
        .default(8080)
        .interact_text()?;
    let url: String = Input::with_theme(&theme)
        .with_prompt("SQLite database file")
        .default("aulas.db".to_string())
        .interact_text()?;
    let busy_timeout_ms: u32 = Input::with_theme(&theme)
        .with_prompt("Wait on a locked database for (ms)")
        .default(5000)
        .interact_text()?;

    let config = Config {
        server: ServerConfig {
            host,
            port,
            https: None,
            ui_path: None,
        },
        database: DatabaseConfig {
            url,
            busy_timeout_ms,
        },
        jwt: JwtConfig {
            secret: uuid::Uuid::new_v4().to_string(),
            expiration_hours: 24,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
    };

    std::fs::write(DEFAULT_CONFIG_PATH, toml::to_string_pretty(&config)?)?;
    println!(
        "\nWrote {}. The first start creates user 'admin' with password 'admin'.\n",
        DEFAULT_CONFIG_PATH
    );
    Ok(config)
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("Cannot read config {}", path)),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(DEFAULT_CONFIG_PATH),
        None if console::user_attended() => run_onboarding(),
        None => anyhow::bail!(
            "{} not found; pass --config or run with --generate-config to get a template",
            DEFAULT_CONFIG_PATH
        ),
    }
}

pub fn build_router(state: AppState) -> Router {
    let static_path = state
        .config
        .server
        .ui_path
        .clone()
        .unwrap_or_else(|| "static".to_string());

    // Unknown paths fall back to index.html so the UI can route client-side.
    let ui = ServeDir::new(&static_path)
        .not_found_service(ServeFile::new(format!("{}/index.html", static_path)));

    Router::new()
        .nest("/api", api::routes(state.clone()))
        .fallback_service(ui)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn open_database(config: &Config) -> Result<DbPool> {
    let pool = db::create_pool(
        &config.database.url,
        ConnectionOptions {
            busy_timeout_ms: config.database.busy_timeout_ms,
        },
    )?;

    let mut conn = pool.get()?;
    db::run_migrations(&mut conn)?;
    drop(conn);

    seeding::seed_defaults(&pool)?;
    Ok(pool)
}

async fn serve(app: Router, config: &Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server host/port")?;

    match config.server.https.as_ref().filter(|https| https.enabled) {
        Some(https) => {
            use axum_server::tls_rustls::RustlsConfig;

            for file in [&https.cert_path, &https.key_path] {
                if !Path::new(file).exists() {
                    anyhow::bail!("TLS file not found: {}", file);
                }
            }
            let tls = RustlsConfig::from_pem_file(&https.cert_path, &https.key_path).await?;

            tracing::info!("Aulas listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!("Aulas listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", Config::default_template());
        return Ok(());
    }

    let config = load_config(&cli)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("aulas_server={},tower_http=debug", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = open_database(&config)?;
    tracing::info!("Database {} ready", config.database.url);

    let app = build_router(AppState::new(pool, config.clone()));
    serve(app, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::prelude::*;

    #[test]
    fn test_open_database_migrates_and_seeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut config: Config = toml::from_str(Config::default_template()).unwrap();
        config.database.url = format!("sqlite://{}", dir.path().join("aulas.db").display());

        let pool = open_database(&config).unwrap();
        // A second start finds everything in place
        let pool_again = open_database(&config).unwrap();

        use crate::schema::{periods, users};
        let mut conn = pool.get().unwrap();
        let admins: i64 = users::table
            .filter(users::role.eq("admin"))
            .count()
            .get_result(&mut conn)
            .unwrap();
        let terms: i64 = periods::table.count().get_result(&mut conn).unwrap();
        assert_eq!((admins, terms), (1, 1));
        drop(pool_again);
    }
}
