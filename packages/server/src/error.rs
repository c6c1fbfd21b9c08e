use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use serde::Serialize;

use crate::catalog::CatalogError;
use crate::service::{CreateError, GetError, UpdateError, UploadError};

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `IDENTITY_MISSING`, `IDENTITY_INVALID`, `NOT_FOUND`, `FORBIDDEN`,
    /// `CONFLICT`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "No mesh files detected")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    /// Client input error (empty upload batch, bad field, malformed id).
    Validation(String),
    /// The gateway did not forward a user identity.
    IdentityMissing,
    /// The forwarded identity is malformed.
    IdentityInvalid,
    NotFound(String),
    /// The requester is not the owner.
    Forbidden(String),
    /// Duplicate mesh name or concurrent modification.
    Conflict(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::IdentityMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "IDENTITY_MISSING",
                    message: "No user identity supplied".into(),
                },
            ),
            AppError::IdentityInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "IDENTITY_INVALID",
                    message: "Malformed user identity".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "FORBIDDEN",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => AppError::NotFound(format!("File {id} does not exist")),
            StorageError::SizeLimitExceeded { actual, limit } => AppError::Validation(format!(
                "File exceeds maximum size of {limit} bytes (got {actual})"
            )),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::DuplicateName(name) => {
                AppError::Conflict(format!("A mesh with name '{name}' already exists"))
            }
            CatalogError::MeshNotFound(id) => {
                AppError::NotFound(format!("Mesh {id} does not exist"))
            }
            CatalogError::CollectionNotFound(id) => {
                AppError::NotFound(format!("File collection {id} does not exist"))
            }
            CatalogError::VersionConflict { .. } => {
                AppError::Conflict("Mesh was modified concurrently, retry".into())
            }
            CatalogError::Unavailable(detail) => AppError::Internal(detail),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::EmptyUpload => AppError::Validation("No mesh files detected".into()),
            // An oversized file is the client's to fix, even though the
            // store is what rejects it mid-batch.
            UploadError::Store {
                filename,
                source: StorageError::SizeLimitExceeded { actual, limit },
                ..
            } => AppError::Validation(format!(
                "File '{filename}' exceeds maximum size of {limit} bytes (got {actual})"
            )),
            store_err @ UploadError::Store { .. } => AppError::Internal(store_err.to_string()),
            persist @ UploadError::Persist { .. } => AppError::Internal(persist.to_string()),
        }
    }
}

impl From<CreateError> for AppError {
    fn from(err: CreateError) -> Self {
        match err {
            CreateError::Upload(upload) => upload.into(),
            CreateError::DuplicateName(name) => {
                AppError::Conflict(format!("A mesh with name '{name}' already exists"))
            }
            CreateError::Persist(source) => AppError::Internal(source.to_string()),
        }
    }
}

impl From<GetError> for AppError {
    fn from(err: GetError) -> Self {
        match err {
            GetError::NotFound(id) => AppError::NotFound(format!("Mesh {id} does not exist")),
            GetError::Unauthorized { mesh, .. } => {
                AppError::Forbidden(format!("Not authorized to interact with mesh {mesh}"))
            }
            GetError::Catalog(source) => source.into(),
        }
    }
}

impl From<UpdateError> for AppError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::Get(get) => get.into(),
            UpdateError::DuplicateName(name) => {
                AppError::Conflict(format!("A mesh with name '{name}' already exists"))
            }
            UpdateError::Conflict => {
                AppError::Conflict("Mesh was modified concurrently, retry".into())
            }
            UpdateError::Catalog(source) => source.into(),
        }
    }
}
