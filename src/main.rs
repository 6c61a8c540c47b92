//! PG Analytics backend server.
//!
//! Serves the authentication/session API for the PostgreSQL monitoring
//! stack. Reads configuration from a TOML file
//! (`~/.config/pganalytics/config.toml`).

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use pganalytics::config::{default_config_path, AppConfig};
use pganalytics::infrastructure::cache::init_token_cache;
use pganalytics::infrastructure::crypto::jwt::JwtConfig;
use pganalytics::infrastructure::database::migrator::Migrator;
use pganalytics::{create_api_router, init_database, DatabaseConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("PGANALYTICS_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            warn!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting PG Analytics backend...");

    // ── Prometheus metrics recorder (must be installed before any metrics calls) ──
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    info!("Prometheus metrics recorder installed");

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: app_cfg.database.connection_url(),
    };
    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    create_default_admin(&db, &app_cfg).await;

    // ── Token lifecycle wiring ─────────────────────────────────
    let jwt_config = JwtConfig {
        secret: std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| app_cfg.security.jwt_secret.clone()),
        access_token_minutes: app_cfg.security.access_token_minutes,
        refresh_token_days: app_cfg.security.refresh_token_days,
        issuer: "pganalytics".to_string(),
    };
    info!(
        "JWT configured: {}min access / {}d refresh tokens",
        jwt_config.access_token_minutes, jwt_config.refresh_token_days
    );

    let cache = init_token_cache(&app_cfg.cache).await;

    // ── REST API ───────────────────────────────────────────────
    let router = create_api_router(db.clone(), cache, jwt_config, prometheus_handle);

    let addr = format!("{}:{}", app_cfg.server.host, app_cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("REST API server listening on http://{}", addr);
    info!("Swagger UI available at http://{}/docs/", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    }
    info!("PG Analytics backend shutdown complete");
    Ok(())
}

/// Create the bootstrap admin account if no users exist yet
async fn create_default_admin(db: &sea_orm::DatabaseConnection, app_cfg: &AppConfig) {
    use pganalytics::domain::{CreateUserDto, UserRepositoryInterface, UserRole};
    use pganalytics::infrastructure::database::entities::user;
    use pganalytics::infrastructure::database::repositories::UserRepository;
    use sea_orm::{EntityTrait, PaginatorTrait};

    let users_count = user::Entity::find().count(db).await.unwrap_or(0);
    if users_count > 0 {
        return;
    }

    info!("Creating default admin user...");
    let repo = UserRepository::new(db.clone());
    match repo
        .create_user(CreateUserDto {
            username: app_cfg.admin.username.clone(),
            email: app_cfg.admin.email.clone(),
            full_name: app_cfg.admin.full_name.clone(),
            password: app_cfg.admin.password.clone(),
            role: Some(UserRole::Admin),
        })
        .await
    {
        Ok(admin) => {
            info!("Default admin created: {}", admin.email);
            warn!("Please change the admin password immediately!");
        }
        Err(e) => {
            error!("Failed to create admin user: {}", e);
        }
    }
}
