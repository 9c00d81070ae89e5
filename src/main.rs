use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use nearby_subs::config::{LoggingSettings, Settings};
use nearby_subs::core::SchemaRules;
use nearby_subs::routes::{self, nearby::AppState};
use nearby_subs::services::{Dataset, ReverseGeocoder, Session};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("Query payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// LOG_LEVEL / LOG_FORMAT win over the configured values
fn init_logging(logging: &LoggingSettings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match format.as_str() {
        "json" => subscriber.json().init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.pretty().init(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Logging is configured from settings, so settings come first
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    init_logging(&settings.logging);

    info!("Starting Nearby Subs service...");

    let rules = SchemaRules::for_policy(settings.schema.sub_column);
    let session = Arc::new(Session::new());

    // Default dataset is optional; without it the service waits for an upload
    let default_path = Path::new(&settings.dataset.path);
    if default_path.exists() {
        match Dataset::from_path(default_path, settings.dataset.sheet.as_deref(), &rules) {
            Ok(dataset) => {
                info!(
                    "Loaded default dataset {} (sheet {}, {} rows)",
                    dataset.source,
                    dataset.sheet,
                    dataset.records.len()
                );
                session.replace(dataset).await;
            }
            Err(e) => error!("Error loading default dataset '{}': {}", settings.dataset.path, e),
        }
    } else {
        info!(
            "Default dataset '{}' not found; upload a file with columns Sub Name, Lattitude, Longitude",
            settings.dataset.path
        );
    }

    // Reverse geocoder (optional - labels stay empty without it)
    let geocoder = if settings.enrichment.enabled {
        match ReverseGeocoder::new(
            settings.enrichment.endpoint.clone(),
            settings.enrichment.user_agent.clone(),
            settings.enrichment.timeout_secs,
            settings.enrichment.cache_size,
            settings.enrichment.cache_ttl_secs,
        ) {
            Ok(g) => {
                info!("Reverse geocoder enabled ({})", settings.enrichment.endpoint);
                Some(Arc::new(g))
            }
            Err(e) => {
                warn!("Failed to build reverse geocoder ({}), running without enrichment", e);
                None
            }
        }
    } else {
        None
    };

    let app_state = AppState {
        session,
        geocoder,
        query: settings.query,
        rules,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(1);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PayloadConfig::new(16 * 1024 * 1024))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
