use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use fyb_core::generator::{GenerationRequest, Generator, OutputFormat};
use fyb_core::record::{self, ColumnMapping};
use fyb_core::template::{self, TemplateKind};

use crate::config::Config;

pub struct AppState {
    pub generator: Generator,
    pub config: Config,
}

type ApiError = (StatusCode, String);

fn bad_request(message: impl ToString) -> ApiError {
    (StatusCode::BAD_REQUEST, message.to_string())
}

fn internal_error(message: impl ToString) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
}

/// Uploaded form data for the generate and header endpoints.
#[derive(Default)]
struct UploadForm {
    csv: Option<Vec<u8>>,
    template: Option<String>,
    column_mapping: Option<String>,
    format: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Invalid upload: {}", e)))?
    {
        match field.name() {
            Some("csvFile") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Invalid upload: {}", e)))?;
                form.csv = Some(bytes.to_vec());
            }
            Some("template") => {
                form.template = Some(field.text().await.unwrap_or_default());
            }
            Some("columnMapping") => {
                form.column_mapping = Some(field.text().await.unwrap_or_default());
            }
            Some("format") => {
                form.format = Some(field.text().await.unwrap_or_default());
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn save_upload(state: &AppState, csv: &[u8]) -> Result<PathBuf, ApiError> {
    let upload_dir = PathBuf::from(&state.config.upload_dir);
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| internal_error(format!("Failed to create upload directory: {}", e)))?;

    let path = upload_dir.join(format!("{}.csv", Uuid::now_v7()));
    tokio::fs::write(&path, csv)
        .await
        .map_err(|e| internal_error(format!("Failed to store upload: {}", e)))?;
    Ok(path)
}

async fn discard_upload(path: &PathBuf) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove upload {}: {}", path.display(), e);
    }
}

/// POST /api/csv/headers: upload a CSV, respond with its column names.
pub async fn csv_headers(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = read_form(multipart).await?;
    let csv = form
        .csv
        .ok_or_else(|| bad_request("No CSV file uploaded"))?;

    let upload_path = save_upload(&state, &csv).await?;
    let headers = state.generator.csv_headers(&upload_path).await;
    discard_upload(&upload_path).await;

    let headers = headers.map_err(|e| {
        tracing::error!("Error reading CSV headers: {:#}", e);
        internal_error("Error reading CSV headers")
    })?;
    Ok(Json(json!(headers)))
}

/// POST /api/generate: upload a CSV and run one generation batch.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = read_form(multipart).await?;
    let csv = form
        .csv
        .ok_or_else(|| bad_request("No CSV file uploaded"))?;

    let template_name = form
        .template
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| template::DEFAULT_TEMPLATE.to_string());

    let column_mapping = parse_mapping(form.column_mapping.as_deref());

    let output_format = match form.format.as_deref() {
        Some(value) if !value.is_empty() => Some(
            value
                .parse::<OutputFormat>()
                .map_err(|e| bad_request(e.to_string()))?,
        ),
        _ => None,
    };

    let run_id = Uuid::now_v7().to_string();
    let output_dir = PathBuf::from(&state.config.public_dir)
        .join("generated")
        .join(&run_id);

    let upload_path = save_upload(&state, &csv).await?;

    let request = GenerationRequest {
        csv_path: upload_path.clone(),
        output_dir,
        template_name,
        column_mapping,
        output_format,
    };
    let result = state.generator.generate(&request).await;
    discard_upload(&upload_path).await;

    let summary = result.map_err(|e| {
        tracing::error!("Error generating images: {:#}", e);
        internal_error(format!("Error generating images: {}", e))
    })?;

    Ok(Json(json!({
        "success": true,
        "count": summary.generated,
        "failed": summary.failed,
        "downloadPath": format!("/generated/{}", run_id),
    })))
}

/// Lenient mapping parse: invalid JSON or an empty object means "no mapping".
fn parse_mapping(raw: Option<&str>) -> Option<ColumnMapping> {
    let raw = raw?;
    let mapping: ColumnMapping = serde_json::from_str(raw).ok()?;
    if mapping.is_empty() {
        None
    } else {
        Some(mapping)
    }
}

#[derive(Deserialize)]
pub struct TemplatesQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// GET /api/templates: template descriptors, optionally filtered by
/// backend type.
pub async fn templates(
    Query(query): Query<TemplatesQuery>,
) -> Result<Json<Value>, ApiError> {
    let configs: Vec<&template::TemplateConfig> = match query.kind.as_deref() {
        Some(value) => {
            let kind = TemplateKind::parse(value)
                .ok_or_else(|| bad_request(format!("Unknown template type '{}'", value)))?;
            template::list_by_kind(kind)
        }
        None => template::all().iter().collect(),
    };

    let payload: Vec<Value> = configs
        .iter()
        .map(|config| json!({ "name": config.name, "config": config }))
        .collect();
    Ok(Json(json!(payload)))
}

/// GET /api/formats: supported output formats.
pub async fn formats() -> Json<Value> {
    let names: Vec<&str> = OutputFormat::ALL.iter().map(|f| f.extension()).collect();
    Json(json!(names))
}

/// GET /api/mapping/default: the sample column mapping.
pub async fn default_mapping() -> Json<Value> {
    let mapping: Value =
        serde_json::from_str(record::SAMPLE_MAPPING_JSON).expect("sample mapping is valid JSON");
    Json(mapping)
}

/// POST /api/mapping/validate: check a mapping document and report
/// logical fields that no template knows about.
pub async fn validate_mapping(
    Json(mapping): Json<HashMap<String, String>>,
) -> Json<Value> {
    let mut unknown: Vec<&str> = mapping
        .keys()
        .map(String::as_str)
        .filter(|key| !record::WELL_KNOWN_FIELDS.contains(key))
        .collect();
    unknown.sort_unstable();

    Json(json!({
        "valid": true,
        "fields": mapping.len(),
        "unknownFields": unknown,
    }))
}

/// GET /health
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// GET /stats: basic server information.
pub async fn stats() -> Json<Value> {
    Json(json!({
        "status": "running",
        "service": "fyb-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
