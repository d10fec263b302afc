use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use registry_core::config::{database_path_from_env_value, page_size_from_env_value};
use registry_core::{CoreConfig, Database};

/// Main entry point for the clinic registry server
///
/// Opens (and if needed creates) the SQLite database, then serves the REST API with its
/// Swagger UI at `/swagger-ui`.
///
/// # Environment Variables
/// - `CLINICA_DATABASE`: SQLite file (default: "clinica.sqlite3")
/// - `CLINICA_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CLINICA_PAGE_SIZE`: patients per listing page (default: 20)
/// - `API_KEY`: key every request except `/health` must send in `x-api-key`
///
/// # Errors
/// Returns an error if the configuration is invalid, the database cannot be opened, the
/// address cannot be bound, or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinica_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("registry_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(CoreConfig::new(
        database_path_from_env_value(std::env::var("CLINICA_DATABASE").ok()),
        page_size_from_env_value(std::env::var("CLINICA_PAGE_SIZE").ok())?,
    )?);
    let api_key = std::env::var("API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        tracing::warn!("API_KEY not set; every protected route will answer 401");
    }

    let db = Arc::new(Database::open(cfg.database_path())?);
    tracing::info!("++ Using database {}", cfg.database_path().display());

    let rest_addr = std::env::var("CLINICA_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    tracing::info!("++ Starting clinic registry REST on {}", rest_addr);

    let app = router(AppState::new(db, cfg, api_key));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
