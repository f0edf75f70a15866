//! JWT authentication middleware and role guards.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::TOKEN_TYPE_BEARER;
use crate::domain::UserRole;
use crate::errors::AppError;

/// Authenticated user extracted from JWT token
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// JWT authentication middleware.
///
/// Validates the bearer token, then loads the account it names so that a
/// blocked, deleted or re-roled user is judged by their current record.
/// The resulting CurrentUser goes into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = bearer_token(auth_header).ok_or(AppError::Unauthorized)?;
    let account = state.auth_service.authenticate(token).await?;

    request.extensions_mut().insert(CurrentUser {
        id: account.id,
        email: account.email,
        role: account.role,
    });

    Ok(next.run(request).await)
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme == TOKEN_TYPE_BEARER && !token.is_empty()).then_some(token)
}

/// Require admin role, returns Forbidden error if not admin.
pub fn require_admin(user: &CurrentUser) -> Result<(), AppError> {
    require_role(user, UserRole::Admin)
}

/// Require `required` or any role above it
pub fn require_role(user: &CurrentUser, required: UserRole) -> Result<(), AppError> {
    if user.role.has_permission(required) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "clerk@tea-logistics.local".into(),
            role,
        }
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc.def"), None);
    }

    #[test]
    fn role_guards_follow_hierarchy() {
        assert!(require_role(&user(UserRole::Manager), UserRole::Operator).is_ok());
        assert!(require_role(&user(UserRole::Operator), UserRole::Manager).is_err());
        assert!(require_admin(&user(UserRole::Manager)).is_err());
        assert!(require_admin(&user(UserRole::Admin)).is_ok());
    }
}
