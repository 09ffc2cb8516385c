use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::warn;
use uuid::Uuid;

use shared_models::auth::{User, ROLE_DOCTOR};
use shared_models::error::AppError;

use crate::extractor::extract_user;

pub fn require_role(user: &User, role: &str) -> Result<(), AppError> {
    if user.has_role(role) {
        Ok(())
    } else {
        warn!("User {} lacks role {}", user.id, role);
        Err(AppError::Forbidden(format!("This action requires the {} role", role)))
    }
}

/// Layer for the doctor-only route group. Runs after [`crate::extractor::auth_middleware`].
pub async fn doctor_only(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = extract_user(&request)?;
    require_role(&user, ROLE_DOCTOR)?;
    Ok(next.run(request).await)
}

/// `caller` must be `owner`.
pub fn ensure_owner(owner: Uuid, caller: Uuid, resource: &str) -> Result<(), AppError> {
    if owner == caller {
        Ok(())
    } else {
        warn!("{} attempted to act on {} owned by {}", caller, resource, owner);
        Err(AppError::Forbidden(format!("You do not have access to this {}", resource)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestUser;

    #[test]
    fn role_check() {
        let doctor = TestUser::doctor("d@example.com").to_user();
        let patient = TestUser::patient("p@example.com").to_user();
        assert!(require_role(&doctor, ROLE_DOCTOR).is_ok());
        assert!(matches!(require_role(&patient, ROLE_DOCTOR), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn owner_check() {
        let id = Uuid::new_v4();
        assert!(ensure_owner(id, id, "appointment").is_ok());
        assert!(matches!(
            ensure_owner(id, Uuid::new_v4(), "appointment"),
            Err(AppError::Forbidden(_))
        ));
    }
}
