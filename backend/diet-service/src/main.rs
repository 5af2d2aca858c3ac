use actix_web::{web, App, HttpServer};
use anyhow::Context;
use diet_service::config::{Config, DataSourceKind};
use diet_service::handlers::{configure, AppState};
use diet_service::services::source::{CsvFoodSource, FoodSource, UsdaClient};
use diet_service::{Recommender, RecommenderWorker};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},actix_web=info", config.log_level)));
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting diet-service v{}", env!("CARGO_PKG_VERSION"));

    let source: Arc<dyn FoodSource> = match config.data_source {
        DataSourceKind::Usda => {
            info!("Using USDA FoodData Central at {}", config.usda_api_url);
            Arc::new(
                UsdaClient::new(
                    config.usda_api_url.clone(),
                    config.usda_api_key.clone(),
                    config.usda_page_size,
                )
                .context("Failed to build USDA client")?,
            )
        }
        DataSourceKind::Csv => {
            let path = config
                .csv_path
                .clone()
                .context("CSV path is required when data_source=csv")?;
            info!("Using CSV food file {}", path.display());
            Arc::new(CsvFoodSource::new(path))
        }
    };

    let recommender = Arc::new(Recommender::new(source, config.recommender()));
    let handle = RecommenderWorker::spawn(recommender);

    let backup_path = config
        .backup_path
        .clone()
        .filter(|p| !p.as_os_str().is_empty());

    let state = web::Data::new(AppState {
        recommender: handle,
        backup_path,
        default_top_n: config.default_top_n,
    });

    let addr = format!("{}:{}", config.http_host, config.http_port);
    info!("HTTP server listening on {}", addr);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(&addr)
        .with_context(|| format!("Failed to bind {}", addr))?
        .run()
        .await?;

    Ok(())
}
