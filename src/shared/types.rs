use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Envelope shared by every asset endpoint except the listing.
///
/// Successful responses carry `message` and optionally `data`; failures carry
/// `error` and, for validation failures, one entry per offending field in `errors`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: Option<String>) -> Self {
        Self {
            message,
            data,
            error: None,
            errors: None,
        }
    }

    pub fn error(message: String, errors: Option<Vec<String>>) -> ApiResponse<()> {
        ApiResponse {
            message: None,
            data: None,
            error: Some(message),
            errors,
        }
    }
}
