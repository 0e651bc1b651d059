use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::database::user_ops;
use crate::error::AppError;
use crate::AppState;
use stratus_entity::user;

/// Authenticated caller, resolved from the `X-User-Id` header set by
/// the fronting proxy
pub struct AuthUser {
    pub user: user::Model,
}

impl AuthUser {
    /// Elevated accounts may act on other users' records
    pub fn is_elevated(&self) -> bool {
        self.user.is_superuser
    }

    /// Guard for endpoints restricted to elevated accounts
    pub fn require_elevated(&self) -> Result<(), AppError> {
        if self.user.is_superuser {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-Id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i32>().ok())
            .ok_or(AppError::Unauthorized)?;

        let user = user_ops::get_user_by_id(&state.db, user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser { user })
    }
}
