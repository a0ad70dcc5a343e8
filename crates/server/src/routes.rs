//! HTTP surface of webbook.
//!
//! Every endpoint below `/api/sessions` operates on one upload's editing
//! state. Handlers lock the session store for their whole body, so edits
//! against a single session are serialized.

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use webbook_sheet::{report, CellValue, ReportSpec, SheetError};
use webbook_viz::{ChartKind, ChartSpec};

use crate::error::{ApiError, ApiResult};
use crate::session::{EditSession, SessionStore};

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLSM_CONTENT_TYPE: &str = "application/vnd.ms-excel.sheet.macroEnabled.12";

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        AppState {
            sessions: SessionStore::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check response.
#[derive(Serialize, Deserialize)]
pub struct Health {
    /// Server status ("ok" when healthy).
    pub status: String,
    /// Server version from Cargo.toml.
    pub version: String,
}

/// Health check endpoint handler.
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create the application router.
///
/// This is separated from `main()` to allow testing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/workbook", get(download_workbook))
        .route("/api/sessions/:id/export.zip", get(download_csv_zip))
        .route("/api/sessions/:id/sheets/:sheet", get(get_sheet))
        .route("/api/sessions/:id/sheets/:sheet/csv", get(download_sheet_csv))
        .route(
            "/api/sessions/:id/sheets/:sheet/rows",
            post(append_row).delete(delete_rows),
        )
        .route("/api/sessions/:id/sheets/:sheet/cells", put(set_cell))
        .route("/api/sessions/:id/sheets/:sheet/reset", post(reset_sheet))
        .route("/api/sessions/:id/sheets/:sheet/report", post(run_report))
        .route("/api/sessions/:id/sheets/:sheet/chart", post(build_chart))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn session_not_found(id: Uuid) -> ApiError {
    ApiError::not_found(format!("Session not found: {id}"))
}

/// `POST /api/sessions` - upload a workbook, get an editing session back.
async fn create_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("workbook.xlsx").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;

        let session = EditSession::new(&file_name, bytes.to_vec())?;
        let sheets: Vec<String> = session
            .book
            .sheet_names()
            .iter()
            .map(ToString::to_string)
            .collect();
        let id = state.sessions.insert(session);
        tracing::info!(%id, file = %file_name, sheets = sheets.len(), "session created");

        return Ok((
            StatusCode::CREATED,
            Json(json!({ "id": id, "file_name": file_name, "sheets": sheets })),
        )
            .into_response());
    }
    Err(ApiError::bad_request("Missing multipart field: file"))
}

/// `GET /api/sessions/:id` - session metadata and sheet list.
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let body = state
        .sessions
        .with_session(id, |session| {
            let sheets: Vec<String> = session
                .book
                .sheet_names()
                .iter()
                .map(ToString::to_string)
                .collect();
            json!({
                "id": id,
                "file_name": session.file_name,
                "macro_enabled": session.macro_enabled(),
                "sheets": sheets,
            })
        })
        .ok_or_else(|| session_not_found(id))?;
    Ok(Json(body))
}

/// `DELETE /api/sessions/:id` - drop the session and its buffers.
async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    if state.sessions.remove(id) {
        tracing::info!(%id, "session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(id))
    }
}

/// `GET /api/sessions/:id/sheets/:sheet` - full sheet contents.
async fn get_sheet(
    State(state): State<AppState>,
    Path((id, sheet)): Path<(Uuid, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let body = state
        .sessions
        .with_session(id, |session| -> Result<_, SheetError> {
            let sheet = session.book.get_sheet(&sheet)?;
            Ok(json!({
                "name": sheet.name(),
                "columns": sheet.columns(),
                "rows": sheet.rows(),
            }))
        })
        .ok_or_else(|| session_not_found(id))??;
    Ok(Json(body))
}

#[derive(Deserialize)]
struct AppendRowRequest {
    /// Column name to raw value; unlisted columns become empty cells and
    /// unknown names are ignored.
    values: HashMap<String, String>,
}

/// `POST /api/sessions/:id/sheets/:sheet/rows` - append one row.
async fn append_row(
    State(state): State<AppState>,
    Path((id, sheet)): Path<(Uuid, String)>,
    Json(request): Json<AppendRowRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let body = state
        .sessions
        .with_session(id, |session| -> Result<_, SheetError> {
            let sheet = session.book.get_sheet_mut(&sheet)?;
            let row: Vec<CellValue> = sheet
                .columns()
                .iter()
                .map(|column| {
                    request
                        .values
                        .get(column)
                        .map_or(CellValue::Null, |raw| CellValue::normalize(raw))
                })
                .collect();
            let index = sheet.row_append_padded(row);
            Ok(json!({
                "index": index,
                "row": sheet.rows()[index],
                "row_count": sheet.row_count(),
            }))
        })
        .ok_or_else(|| session_not_found(id))??;
    Ok(Json(body))
}

#[derive(Deserialize)]
struct DeleteRowsRequest {
    indices: Vec<usize>,
}

/// `DELETE /api/sessions/:id/sheets/:sheet/rows` - delete rows by index.
async fn delete_rows(
    State(state): State<AppState>,
    Path((id, sheet)): Path<(Uuid, String)>,
    Json(request): Json<DeleteRowsRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let body = state
        .sessions
        .with_session(id, |session| -> Result<_, SheetError> {
            let sheet = session.book.get_sheet_mut(&sheet)?;
            let removed = sheet.row_delete_multi(&request.indices);
            Ok(json!({ "removed": removed, "row_count": sheet.row_count() }))
        })
        .ok_or_else(|| session_not_found(id))??;
    Ok(Json(body))
}

#[derive(Deserialize)]
struct SetCellRequest {
    row: usize,
    column: String,
    value: String,
}

/// `PUT /api/sessions/:id/sheets/:sheet/cells` - edit one cell.
///
/// The response echoes the typed value the raw edit normalized into, so
/// the client can show what was actually stored.
async fn set_cell(
    State(state): State<AppState>,
    Path((id, sheet)): Path<(Uuid, String)>,
    Json(request): Json<SetCellRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let body = state
        .sessions
        .with_session(id, |session| -> Result<_, SheetError> {
            let sheet = session.book.get_sheet_mut(&sheet)?;
            let stored = sheet.set_cell(request.row, &request.column, &request.value)?;
            Ok(json!({
                "row": request.row,
                "column": request.column,
                "value": stored,
            }))
        })
        .ok_or_else(|| session_not_found(id))??;
    Ok(Json(body))
}

/// `POST /api/sessions/:id/sheets/:sheet/reset` - discard one sheet's
/// edits by re-reading it from the uploaded bytes.
async fn reset_sheet(
    State(state): State<AppState>,
    Path((id, sheet)): Path<(Uuid, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .sessions
        .with_session(id, |session| session.reset_sheet(&sheet))
        .ok_or_else(|| session_not_found(id))??;
    Ok(Json(json!({ "reset": sheet })))
}

/// `POST /api/sessions/:id/sheets/:sheet/report` - grouped aggregation.
///
/// The summary table is returned both as structured columns/rows and as
/// ready-to-download CSV text.
async fn run_report(
    State(state): State<AppState>,
    Path((id, sheet)): Path<(Uuid, String)>,
    Json(spec): Json<ReportSpec>,
) -> ApiResult<Json<serde_json::Value>> {
    let body = state
        .sessions
        .with_session(id, |session| -> Result<_, SheetError> {
            let sheet = session.book.get_sheet(&sheet)?;
            let summary = report(sheet, &spec)?;
            let csv = summary.to_csv_string()?;
            Ok(json!({
                "columns": summary.columns(),
                "rows": summary.rows(),
                "csv": csv,
            }))
        })
        .ok_or_else(|| session_not_found(id))??;
    Ok(Json(body))
}

#[derive(Deserialize)]
struct ChartRequest {
    kind: ChartKind,
    x: String,
    y: Vec<String>,
}

/// `POST /api/sessions/:id/sheets/:sheet/chart` - build a chart spec.
async fn build_chart(
    State(state): State<AppState>,
    Path((id, sheet)): Path<(Uuid, String)>,
    Json(request): Json<ChartRequest>,
) -> ApiResult<Json<ChartSpec>> {
    let spec = state
        .sessions
        .with_session(id, |session| -> ApiResult<ChartSpec> {
            let sheet = session.book.get_sheet(&sheet)?;
            Ok(ChartSpec::from_sheet(sheet, request.kind, &request.x, &request.y)?)
        })
        .ok_or_else(|| session_not_found(id))??;
    Ok(Json(spec))
}

/// `GET /api/sessions/:id/workbook` - save the edited workbook back into
/// its original container, macros and all untouched parts preserved.
async fn download_workbook(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let (file_name, macro_enabled, bytes) = state
        .sessions
        .with_session(id, |session| -> Result<_, SheetError> {
            let bytes = session.book.save_preserving_macros(&session.original)?;
            Ok((session.file_name.clone(), session.macro_enabled(), bytes))
        })
        .ok_or_else(|| session_not_found(id))??;

    let content_type = if macro_enabled {
        XLSM_CONTENT_TYPE
    } else {
        XLSX_CONTENT_TYPE
    };
    let mut response = download_response(content_type, &file_name, bytes);
    // Saving rewrites worksheet parts from values only; the client shows
    // this notice next to the download.
    response.headers_mut().insert(
        header::WARNING,
        header::HeaderValue::from_static(
            "299 - \"cell styles on edited sheets are not preserved\"",
        ),
    );
    Ok(response)
}

/// `GET /api/sessions/:id/export.zip` - every sheet as CSV, zipped.
async fn download_csv_zip(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let (file_name, bytes) = state
        .sessions
        .with_session(id, |session| -> Result<_, SheetError> {
            let bytes = session.book.export_csv_zip()?;
            Ok((session.file_name.clone(), bytes))
        })
        .ok_or_else(|| session_not_found(id))??;

    let stem = file_name.rsplit_once('.').map_or(file_name.as_str(), |(s, _)| s);
    Ok(download_response(
        "application/zip",
        &format!("{stem}_csv.zip"),
        bytes,
    ))
}

/// `GET /api/sessions/:id/sheets/:sheet/csv` - one sheet as CSV text.
async fn download_sheet_csv(
    State(state): State<AppState>,
    Path((id, sheet)): Path<(Uuid, String)>,
) -> ApiResult<Response> {
    let csv = state
        .sessions
        .with_session(id, |session| -> Result<_, SheetError> {
            session.book.get_sheet(&sheet)?.to_csv_string()
        })
        .ok_or_else(|| session_not_found(id))??;
    Ok(download_response(
        "text/csv",
        &format!("{sheet}.csv"),
        csv.into_bytes(),
    ))
}

fn download_response(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
