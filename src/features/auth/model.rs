use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Caller identity resolved from a validated access token.
///
/// `sub` is the owning identity stamped on every asset the caller creates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub sub: String,
    /// Token scopes, kept for logging only; assets are scoped by `sub` alone
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl AuthenticatedUser {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            scopes: Vec::new(),
        }
    }
}
