use actix_web::{http::header, web, HttpResponse, Responder};
use validator::Validate;
use crate::config::QuerySettings;
use crate::core::{export_file_name, find_nearby, ranked_rows, to_csv_string, ResultRow, SchemaRules};
use crate::models::{
    DatasetSummary, ErrorResponse, HealthResponse, LoadDatasetRequest, MapResponse,
    NearbyQuery, NearbyResponse, UploadQuery,
};
use crate::services::{Dataset, LoadError, ReverseGeocoder, Session, Workbook};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub geocoder: Option<Arc<ReverseGeocoder>>,
    pub query: QuerySettings,
    pub rules: SchemaRules,
}

/// Configure dataset and nearby routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/dataset", web::get().to(get_dataset))
        .route("/dataset", web::post().to(load_dataset))
        .route("/dataset/upload", web::post().to(upload_dataset))
        .route("/dataset/names", web::get().to(get_names))
        .route("/nearby", web::get().to(nearby))
        .route("/nearby/export", web::get().to(export_nearby))
        .route("/nearby/map", web::get().to(map_nearby));
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

fn no_dataset() -> HttpResponse {
    error_response(
        actix_web::http::StatusCode::CONFLICT,
        "No dataset loaded",
        "Load a dataset via POST /api/v1/dataset or /api/v1/dataset/upload".to_string(),
    )
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let dataset_loaded = state.session.current().await.is_some();

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        dataset_loaded,
    })
}

async fn install(state: &AppState, dataset: Dataset) -> DatasetSummary {
    let dataset = state.session.replace(dataset).await;
    let summary = dataset.summary();
    tracing::info!(
        "Loaded dataset {} from {} (sheet {}, {} rows, {} unique names)",
        summary.id,
        summary.source,
        summary.sheet,
        summary.rows,
        summary.unique_names
    );
    summary
}

/// Load a dataset from a server-side path
///
/// POST /api/v1/dataset
///
/// Request body:
/// ```json
/// { "path": "data/subs.csv", "sheet": "Query2" }
/// ```
async fn load_dataset(
    state: web::Data<AppState>,
    req: web::Json<LoadDatasetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    let LoadDatasetRequest { path, sheet } = req.into_inner();
    let rules = state.rules.clone();

    let loaded = web::block(move || Dataset::from_path(&path, sheet.as_deref(), &rules)).await;

    match loaded {
        Ok(Ok(dataset)) => HttpResponse::Ok().json(install(&state, dataset).await),
        Ok(Err(e)) => {
            tracing::warn!("Dataset load rejected: {}", e);
            error_response(
                actix_web::http::StatusCode::BAD_REQUEST,
                "Could not load dataset",
                e.to_string(),
            )
        }
        Err(e) => {
            tracing::error!("Dataset load task failed: {}", e);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Could not load dataset",
                e.to_string(),
            )
        }
    }
}

/// Load a dataset from an uploaded CSV or spreadsheet body
///
/// POST /api/v1/dataset/upload?name={sheetName}&sheet={sheet}
async fn upload_dataset(
    state: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> impl Responder {
    let UploadQuery { name, sheet } = query.into_inner();
    let name = name.unwrap_or_else(|| "upload".to_string());
    let rules = state.rules.clone();

    let loaded = web::block(move || {
        Workbook::from_bytes(&name, body.to_vec())
            .map_err(LoadError::from)
            .and_then(|wb| Dataset::from_workbook(&wb, "Uploaded file", sheet.as_deref(), &rules))
    })
    .await;

    match loaded {
        Ok(Ok(dataset)) => HttpResponse::Ok().json(install(&state, dataset).await),
        Ok(Err(e)) => {
            tracing::warn!("Upload rejected: {}", e);
            error_response(
                actix_web::http::StatusCode::BAD_REQUEST,
                "Could not read uploaded file",
                e.to_string(),
            )
        }
        Err(e) => {
            tracing::error!("Upload task failed: {}", e);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Could not read uploaded file",
                e.to_string(),
            )
        }
    }
}

/// Summary of the loaded dataset
async fn get_dataset(state: web::Data<AppState>) -> impl Responder {
    match state.session.current().await {
        Some(dataset) => HttpResponse::Ok().json(dataset.summary()),
        None => no_dataset(),
    }
}

/// Sorted unique names for a picker
async fn get_names(state: web::Data<AppState>) -> impl Responder {
    match state.session.current().await {
        Some(dataset) => HttpResponse::Ok().json(dataset.names()),
        None => no_dataset(),
    }
}

/// Validate a nearby query and resolve its radius
fn check_query(state: &AppState, query: &NearbyQuery) -> Result<f64, HttpResponse> {
    if let Err(errors) = query.validate() {
        return Err(error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        ));
    }

    let radius = query.radius.unwrap_or(state.query.default_radius_miles);
    if !state.query.accepts(radius) {
        return Err(error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Invalid radius",
            format!(
                "radius must be between {} and {} miles",
                state.query.min_radius_miles, state.query.max_radius_miles
            ),
        ));
    }
    Ok(radius)
}

async fn run_nearby(state: &AppState, query: &NearbyQuery) -> Result<NearbyResponse, HttpResponse> {
    let radius = check_query(state, query)?;
    let dataset = state.session.current().await.ok_or_else(no_dataset)?;

    let (mut center, mut results) = {
        let result = find_nearby(&dataset.records, &query.target, radius, query.by);
        (result.center.as_ref().map(ResultRow::from), ranked_rows(&result))
    };

    if query.enrich {
        match &state.geocoder {
            Some(geocoder) => {
                for row in center.iter_mut().chain(results.iter_mut()) {
                    if row.location_label.is_empty() {
                        let label = geocoder.label_for(row.latitude, row.longitude).await;
                        row.fill_location_label(label);
                    }
                }
            }
            None => tracing::debug!("Enrichment requested but no geocoder is configured"),
        }
    }

    tracing::info!(
        "Query {:?} by {:?} within {} mi: found={}, {} results",
        query.target,
        query.by,
        radius,
        center.is_some(),
        results.len()
    );

    Ok(NearbyResponse {
        target: query.target.clone(),
        radius_miles: radius,
        found: center.is_some(),
        count: results.len(),
        center,
        results,
    })
}

/// Ranked neighbors of a target
///
/// GET /api/v1/nearby?target={name}&radius={miles}&by={name|code}&enrich={bool}
///
/// An unknown target is not an error: the response has `found: false` and
/// no results.
async fn nearby(state: web::Data<AppState>, query: web::Query<NearbyQuery>) -> impl Responder {
    match run_nearby(&state, &query).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(response) => response,
    }
}

/// Ranked neighbors as a CSV download
///
/// GET /api/v1/nearby/export?target={name}&radius={miles}
async fn export_nearby(state: web::Data<AppState>, query: web::Query<NearbyQuery>) -> impl Responder {
    let response = match run_nearby(&state, &query).await {
        Ok(response) => response,
        Err(response) => return response,
    };

    match to_csv_string(&response.results) {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}\"",
                    export_file_name(&response.target, response.radius_miles)
                ),
            ))
            .body(body),
        Err(e) => {
            tracing::error!("CSV export failed: {}", e);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Export failed",
                e.to_string(),
            )
        }
    }
}

/// Center and neighbors as map points, center first
///
/// GET /api/v1/nearby/map?target={name}&radius={miles}
async fn map_nearby(state: web::Data<AppState>, query: web::Query<NearbyQuery>) -> impl Responder {
    let radius = match check_query(&state, &query) {
        Ok(radius) => radius,
        Err(response) => return response,
    };
    let Some(dataset) = state.session.current().await else {
        return no_dataset();
    };

    let points = find_nearby(&dataset.records, &query.target, radius, query.by).map_points();

    HttpResponse::Ok().json(MapResponse {
        target: query.target.clone(),
        points,
    })
}
