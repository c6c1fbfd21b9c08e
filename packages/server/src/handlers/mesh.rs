use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use common::{BlobId, MeshId};
use common::storage::{BlobMeta, StorageError};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::entity::{FilePayload, Mesh};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::mesh::{
    CollectionResponse, FileEntry, MeshListResponse, MeshResponse, UpdateMeshRequest,
    UpdateStateRequest, validate_name,
};
use crate::state::AppState;

pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(512 * 1024 * 1024) // 512 MB
}

#[utoipa::path(
    post,
    path = "/api/v1/meshes",
    tag = "Meshes",
    operation_id = "createMesh",
    summary = "Upload a new mesh",
    description = "Creates a mesh from a multipart upload. The `name` field is required; \
        `short_desc` and `long_desc` are optional text fields. Every field carrying a \
        filename is stored as a mesh file; at least one is required. The batch is \
        all-or-nothing: on any failure no mesh is created.",
    request_body(content_type = "multipart/form-data", description = "Mesh metadata and files"),
    responses(
        (status = 201, description = "Mesh created", body = MeshResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 409, description = "Mesh name already taken (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn create_mesh(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut name: Option<String> = None;
    let mut short_desc = String::new();
    let mut long_desc = String::new();
    let mut payloads: Vec<FilePayload> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if let Some(filename) = field.file_name().map(|s| s.to_string()) {
            let content_type = field
                .content_type()
                .map(|m| m.to_string())
                .or_else(|| {
                    mime_guess::from_path(&filename)
                        .first()
                        .map(|m| m.to_string())
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read '{filename}': {e}")))?;
            payloads.push(FilePayload {
                filename,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        match field.name() {
            Some("name") => name = Some(read_text_field(field, "name").await?),
            Some("short_desc") => short_desc = read_text_field(field, "short_desc").await?,
            Some("long_desc") => long_desc = read_text_field(field, "long_desc").await?,
            _ => {} // Ignore unknown fields.
        }
    }

    let name = name.ok_or_else(|| AppError::Validation("Missing 'name' field".into()))?;
    validate_name(&name)?;

    let mesh = state
        .service
        .create_mesh(
            auth_user.user_id,
            name.trim().to_string(),
            short_desc,
            long_desc,
            &payloads,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(MeshResponse::from(mesh))))
}

async fn read_text_field(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))
}

#[utoipa::path(
    get,
    path = "/api/v1/meshes",
    tag = "Meshes",
    operation_id = "listMeshes",
    summary = "List the caller's meshes",
    description = "Returns all meshes owned by the caller, ordered by creation time.",
    responses(
        (status = 200, description = "Mesh list", body = MeshListResponse),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_meshes(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MeshListResponse>, AppError> {
    let meshes = state.service.list(auth_user.user_id).await?;

    let total = meshes.len() as u64;
    let meshes = meshes.into_iter().map(MeshResponse::from).collect();
    Ok(Json(MeshListResponse { meshes, total }))
}

#[utoipa::path(
    get,
    path = "/api/v1/meshes/{id}",
    tag = "Meshes",
    operation_id = "getMesh",
    summary = "Fetch one mesh",
    description = "Returns the mesh record and refreshes its last-accessed time. \
        Only the owner may read a mesh.",
    params(("id" = String, Path, description = "Mesh ID (UUID)")),
    responses(
        (status = 200, description = "Mesh record", body = MeshResponse),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Mesh not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(mesh_id = %id))]
pub async fn get_mesh(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MeshResponse>, AppError> {
    let id = parse_mesh_id(&id)?;
    let mesh = state.service.get(auth_user.user_id, id).await?;
    Ok(Json(MeshResponse::from(mesh)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/meshes/{id}",
    tag = "Meshes",
    operation_id = "updateMesh",
    summary = "Update mesh metadata",
    description = "Patches name and descriptions. Absent fields are unchanged. \
        Renames are checked against the unique-name constraint.",
    params(("id" = String, Path, description = "Mesh ID (UUID)")),
    request_body = UpdateMeshRequest,
    responses(
        (status = 200, description = "Updated mesh", body = MeshResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Mesh not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name taken or concurrent write (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, body), fields(mesh_id = %id))]
pub async fn update_mesh(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateMeshRequest>,
) -> Result<Json<MeshResponse>, AppError> {
    let id = parse_mesh_id(&id)?;

    let name = match body.name {
        Some(name) => {
            validate_name(&name)?;
            Some(name.trim().to_string())
        }
        None => None,
    };

    let patch = crate::service::MeshPatch {
        name,
        short_desc: body.short_desc,
        long_desc: body.long_desc,
    };
    let mesh = state
        .service
        .update_mesh(auth_user.user_id, id, patch)
        .await?;
    Ok(Json(MeshResponse::from(mesh)))
}

#[utoipa::path(
    put,
    path = "/api/v1/meshes/{id}/state",
    tag = "Meshes",
    operation_id = "updateMeshState",
    summary = "Transition a mesh's lifecycle state",
    description = "Sets the mesh state. Setting the current state again is a no-op \
        that succeeds without touching the record.",
    params(("id" = String, Path, description = "Mesh ID (UUID)")),
    request_body = UpdateStateRequest,
    responses(
        (status = 204, description = "State applied"),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Mesh not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "State could not be persisted (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, body), fields(mesh_id = %id))]
pub async fn update_mesh_state(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateStateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_mesh_id(&id)?;
    let mesh = state.service.get(auth_user.user_id, id).await?;

    if !state.service.update_state(&mesh, body.state).await {
        return Err(AppError::Internal(format!(
            "failed to transition mesh {id} to state {}",
            body.state
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v1/meshes/{id}",
    tag = "Meshes",
    operation_id = "deleteMesh",
    summary = "Delete a mesh",
    description = "Removes the mesh and its file-collection record. Stored files \
        are reclaimed later by the orphan sweep.",
    params(("id" = String, Path, description = "Mesh ID (UUID)")),
    responses(
        (status = 204, description = "Mesh deleted"),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Mesh not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(mesh_id = %id))]
pub async fn delete_mesh(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_mesh_id(&id)?;
    state.service.delete_mesh(auth_user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/meshes/{id}/files",
    tag = "Mesh Files",
    operation_id = "listMeshFiles",
    summary = "List a mesh's files",
    description = "Returns the mesh's file collection: every stored file in upload \
        order, the scene file if one was uploaded, and stem-matched OBJ/MTL pairs.",
    params(("id" = String, Path, description = "Mesh ID (UUID)")),
    responses(
        (status = 200, description = "File collection", body = CollectionResponse),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Mesh not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(mesh_id = %id))]
pub async fn list_mesh_files(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CollectionResponse>, AppError> {
    let id = parse_mesh_id(&id)?;
    let mesh = state.service.get(auth_user.user_id, id).await?;
    let collection = state.service.catalog().get_collection(mesh.files).await?;

    let mut files = Vec::with_capacity(collection.original_files.len());
    for blob_id in &collection.original_files {
        let meta = state.service.store().stat(*blob_id).await?;
        files.push(FileEntry {
            id: blob_id.to_string(),
            filename: meta.filename,
            content_type: meta.content_type,
            size: meta.size,
            checksum: meta.checksum,
            created_at: meta.created_at,
        });
    }

    Ok(Json(CollectionResponse::new(&collection, files)))
}

#[utoipa::path(
    get,
    path = "/api/v1/meshes/{id}/files/{file_id}",
    tag = "Mesh Files",
    operation_id = "downloadMeshFile",
    summary = "Download one mesh file",
    description = "Streams the file content. Supports ETag-based caching via If-None-Match.",
    params(
        ("id" = String, Path, description = "Mesh ID (UUID)"),
        ("file_id" = String, Path, description = "File ID (UUID)"),
    ),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 401, description = "Unauthorized (IDENTITY_MISSING, IDENTITY_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Mesh or file not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, headers), fields(mesh_id = %id, file_id = %file_id))]
pub async fn download_mesh_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, file_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let id = parse_mesh_id(&id)?;
    let file_id: BlobId = file_id
        .parse()
        .map_err(|_| AppError::Validation("Invalid file ID".into()))?;

    let mesh = state.service.get(auth_user.user_id, id).await?;
    let collection = state.service.catalog().get_collection(mesh.files).await?;
    if !collection.references(file_id) {
        return Err(AppError::NotFound("File not found".into()));
    }

    let meta = match state.service.store().stat(file_id).await {
        Ok(meta) => meta,
        Err(StorageError::NotFound(_)) => {
            return Err(AppError::NotFound("File not found".into()));
        }
        Err(err) => return Err(err.into()),
    };

    build_file_response(&mesh, file_id, &meta, &headers, &state).await
}

/// Build a streaming response for one stored file.
async fn build_file_response(
    mesh: &Mesh,
    file_id: BlobId,
    meta: &BlobMeta,
    headers: &HeaderMap,
    state: &AppState,
) -> Result<Response, AppError> {
    let etag_value = format!("\"{}\"", meta.checksum);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    tracing::debug!(mesh = %mesh.id, file = %file_id, "streaming mesh file");
    let reader = state.service.store().fetch_stream(file_id).await?;
    let stream = ReaderStream::new(reader);
    let body = Body::from_stream(stream);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &meta.content_type)
        .header(header::CONTENT_LENGTH, meta.size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&meta.filename),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

fn parse_mesh_id(raw: &str) -> Result<MeshId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation("Invalid mesh ID".into()))
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => (b as char).to_string(),
            other => format!("%{other:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
