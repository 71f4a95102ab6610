use crate::core::error::AppError;
use crate::features::auth::model::AdminPrincipal;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Guard for admin-only handlers.
///
/// Succeeds only when the admin gate placed an [`AdminPrincipal`] in the
/// request extensions.
///
/// # Example
/// ```ignore
/// pub async fn handler(RequireAdmin(admin): RequireAdmin) { ... }
/// ```
pub struct RequireAdmin(pub AdminPrincipal);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = parts
            .extensions
            .get::<AdminPrincipal>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Admin authentication required".to_string()))?;

        Ok(RequireAdmin(admin))
    }
}
