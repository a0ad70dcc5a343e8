use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use webbook_sheet::SheetError;
use webbook_viz::VizError;

/// Error surfaced to the client as a JSON body with a matching status.
///
/// No error here is fatal to the process; the session stays usable and
/// the same operation can be retried after correcting the input.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<SheetError> for ApiError {
    fn from(err: SheetError) -> Self {
        let status = match &err {
            SheetError::Load(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SheetError::EmptySelection
            | SheetError::ColumnNotFound { .. }
            | SheetError::RowIndexOutOfBounds { .. }
            | SheetError::SheetAlreadyExists { .. } => StatusCode::BAD_REQUEST,
            SheetError::SheetNotFound { .. } => StatusCode::NOT_FOUND,
            SheetError::InvalidSheetName { .. } | SheetError::Save(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SheetError::Csv(_) | SheetError::Zip(_) | SheetError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl From<VizError> for ApiError {
    fn from(err: VizError) -> Self {
        let status = match &err {
            VizError::ColumnNotFound { .. } => StatusCode::BAD_REQUEST,
            VizError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
