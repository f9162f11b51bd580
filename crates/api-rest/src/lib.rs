//! # API REST
//!
//! REST API over the ADLS filesystem façade.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - the OpenAPI document, served as JSON
//! - REST-specific concerns (status mapping, CORS)
//!
//! Façade calls block on the store, so every handler runs them through
//! `tokio::task::spawn_blocking`.

#![warn(rust_2018_idioms)]

use adls_core::{DataLakeFileSystem, EntryDetail, EntryType, FsError, FsResult, Listing, StoreError};
use axum::{
    body::Bytes,
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};

/// Application state for the REST API server
#[derive(Clone)]
struct AppState {
    fs: Arc<DataLakeFileSystem>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Listing of everything below `path`, sorted by full path.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListRes {
    pub path: String,
    pub names: Vec<String>,
    /// Present when `detail=true` was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryDetail>>,
}

impl ListRes {
    fn new(path: String, listing: Listing) -> Self {
        match listing {
            Listing::Names(names) => Self {
                path,
                names,
                entries: None,
            },
            Listing::Detailed(entries) => Self {
                path,
                names: entries.iter().map(|e| e.name.clone()).collect(),
                entries: Some(entries),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChecksumRes {
    pub path: String,
    /// The entry's etag, not a content hash
    pub checksum: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MoveReq {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Return full detail records as well as names
    #[serde(default)]
    pub detail: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// First byte to return
    pub start: Option<u64>,
    /// One past the last byte to return
    pub end: Option<u64>,
}

/// A failed request: HTTP status plus a message for the JSON body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<FsError> for ApiError {
    fn from(err: FsError) -> Self {
        let status = match &err {
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            FsError::AlreadyExists(_) | FsError::Remote(StoreError::AlreadyExists(_)) => {
                StatusCode::CONFLICT
            }
            FsError::UnsupportedMode(_)
            | FsError::InvalidPath(_)
            | FsError::IsADirectory(_)
            | FsError::Remote(StoreError::InvalidPath(_))
            | FsError::Remote(StoreError::InvalidRenameTarget(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self.message);
        }
        (
            self.status,
            Json(ErrorRes {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Runs a blocking façade call off the async executor.
async fn run<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&DataLakeFileSystem) -> FsResult<T> + Send + 'static,
{
    let fs = Arc::clone(&state.fs);
    tokio::task::spawn_blocking(move || op(&fs))
        .await
        .map_err(|e| ApiError::internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_root,
        list,
        info,
        checksum,
        read_file,
        write_file,
        make_dir,
        remove,
        move_path,
    ),
    components(schemas(
        HealthRes,
        ListRes,
        ChecksumRes,
        MoveReq,
        ErrorRes,
        EntryDetail,
        EntryType,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router over one mounted filesystem.
pub fn router(fs: Arc<DataLakeFileSystem>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ls", get(list_root))
        .route("/ls/*path", get(list))
        .route("/info/*path", get(info))
        .route("/checksum/*path", get(checksum))
        .route("/files/*path", get(read_file).put(write_file))
        .route("/dirs/*path", post(make_dir))
        .route("/paths/*path", delete(remove))
        .route("/mv", post(move_path))
        .route("/api-docs/openapi.json", get(openapi))
        .layer(CorsLayer::permissive())
        .with_state(AppState { fs })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Does not contact the store.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "ADLS REST API is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/ls",
    params(ListQuery),
    responses(
        (status = 200, description = "Listing of the whole file system", body = ListRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn list_root(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListRes>, ApiError> {
    let listing = run(&state, move |fs| fs.list("", query.detail)).await?;
    Ok(Json(ListRes::new(String::new(), listing)))
}

#[utoipa::path(
    get,
    path = "/ls/{path}",
    params(
        ("path" = String, Path, description = "Directory or file path"),
        ListQuery
    ),
    responses(
        (status = 200, description = "Listing sorted by full path", body = ListRes),
        (status = 404, description = "Path not found", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// List everything below a path
///
/// A missing path is a 404; the store's not-found failure is not swallowed.
#[axum::debug_handler]
async fn list(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListRes>, ApiError> {
    let target = path.clone();
    let listing = run(&state, move |fs| fs.list(&target, query.detail)).await?;
    Ok(Json(ListRes::new(path, listing)))
}

#[utoipa::path(
    get,
    path = "/info/{path}",
    params(("path" = String, Path, description = "File or directory path")),
    responses(
        (status = 200, description = "Detail record", body = EntryDetail),
        (status = 404, description = "Path not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn info(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<Json<EntryDetail>, ApiError> {
    run(&state, move |fs| fs.info(&path)).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/checksum/{path}",
    params(("path" = String, Path, description = "File or directory path")),
    responses(
        (status = 200, description = "Version token of the entry", body = ChecksumRes),
        (status = 404, description = "Path not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn checksum(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<Json<ChecksumRes>, ApiError> {
    let target = path.clone();
    let checksum = run(&state, move |fs| fs.checksum(&target)).await?;
    Ok(Json(ChecksumRes { path, checksum }))
}

#[utoipa::path(
    get,
    path = "/files/{path}",
    params(
        ("path" = String, Path, description = "File path"),
        RangeQuery
    ),
    responses(
        (status = 200, description = "File bytes", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 400, description = "Path is a directory", body = ErrorRes),
        (status = 404, description = "File not found", body = ErrorRes)
    )
)]
/// Read a file, or the byte range `[start, end)` of it
#[axum::debug_handler]
async fn read_file(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Response, ApiError> {
    let data = run(&state, move |fs| match (range.start, range.end) {
        (None, None) => fs.cat(&path),
        (start, end) => {
            let end = match end {
                Some(end) => end,
                None => fs.size(&path)?,
            };
            fs.cat_range(&path, start.unwrap_or(0), end)
        }
    })
    .await?;

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data).into_response())
}

#[utoipa::path(
    put,
    path = "/files/{path}",
    params(("path" = String, Path, description = "File path")),
    request_body(content = Vec<u8>, description = "New file content", content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "File written and committed", body = EntryDetail),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Replace a file with the request body
///
/// The body goes through a write handle, so it is appended in blocks and committed once.
#[axum::debug_handler]
async fn write_file(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<EntryDetail>), ApiError> {
    let detail = run(&state, move |fs| {
        fs.pipe(&path, &body)?;
        fs.info(&path)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    post,
    path = "/dirs/{path}",
    params(("path" = String, Path, description = "Directory path")),
    responses(
        (status = 201, description = "Directory created", body = EntryDetail),
        (status = 500, description = "Creation rejected by the store", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn make_dir(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<(StatusCode, Json<EntryDetail>), ApiError> {
    let detail = run(&state, move |fs| {
        fs.mkdir(&path)?;
        fs.info(&path)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    delete,
    path = "/paths/{path}",
    params(("path" = String, Path, description = "File or directory path")),
    responses(
        (status = 204, description = "Removed, or nothing to remove"),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Remove a file or a directory subtree
///
/// A missing path is skipped, so this answers 204 either way.
#[axum::debug_handler]
async fn remove(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<StatusCode, ApiError> {
    run(&state, move |fs| fs.rm(&path, true)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/mv",
    request_body = MoveReq,
    responses(
        (status = 200, description = "Moved; detail of the destination", body = EntryDetail),
        (status = 404, description = "Source not found", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn move_path(
    State(state): State<AppState>,
    Json(req): Json<MoveReq>,
) -> Result<Json<EntryDetail>, ApiError> {
    run(&state, move |fs| {
        fs.mv(&req.from, &req.to)?;
        fs.info(&req.to)
    })
    .await
    .map(Json)
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
