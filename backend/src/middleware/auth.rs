//! Authentication middleware
//!
//! Validates the bearer JWT issued by the university login service and
//! exposes the caller's role and organizational scope to handlers.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::UserRole;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub unit_id: Option<Uuid>,
    pub faculty_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
}

impl AuthUser {
    /// Check if the user holds one of the given roles
    pub fn has_role(&self, allowed: &[UserRole]) -> bool {
        allowed.contains(&self.role)
    }

    /// Role allow-list guard, run before an operation touches the database
    pub fn require_role(&self, allowed: &[UserRole]) -> AppResult<()> {
        if self.has_role(allowed) {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }

    /// Whether a room of `unit_id` (inside `faculty_id`) is visible to the caller
    pub fn covers_room(&self, unit_id: Uuid, faculty_id: Uuid) -> bool {
        match self.role {
            UserRole::SuperAdmin | UserRole::WarehouseStaff => true,
            UserRole::FacultyAdmin => self.faculty_id == Some(faculty_id),
            UserRole::UnitAdmin | UserRole::UnitStaff => self.unit_id == Some(unit_id),
        }
    }

    /// Whether the caller may act on a request raised in `unit_id` against `warehouse_id`
    pub fn covers_request(&self, unit_id: Uuid, faculty_id: Uuid, warehouse_id: Uuid) -> bool {
        match self.role {
            UserRole::WarehouseStaff => self.warehouse_id == Some(warehouse_id),
            _ => self.covers_room(unit_id, faculty_id),
        }
    }

    /// Whether the caller may act on stock held by `warehouse_id`
    pub fn covers_warehouse(&self, warehouse_id: Uuid, warehouse_faculty: Option<Uuid>) -> bool {
        match self.role {
            UserRole::SuperAdmin => true,
            UserRole::WarehouseStaff => self.warehouse_id == Some(warehouse_id),
            UserRole::FacultyAdmin => {
                warehouse_faculty.is_some() && self.faculty_id == warehouse_faculty
            }
            UserRole::UnitAdmin | UserRole::UnitStaff => false,
        }
    }

    /// Row filter applied to list queries
    pub fn list_scope(&self) -> ListScope {
        // A scoped role without its scope id matches nothing
        let pinned = |id: Option<Uuid>| Some(id.unwrap_or_else(Uuid::nil));
        match self.role {
            UserRole::SuperAdmin => ListScope::default(),
            UserRole::WarehouseStaff => ListScope {
                warehouse_id: pinned(self.warehouse_id),
                ..ListScope::default()
            },
            UserRole::FacultyAdmin => ListScope {
                faculty_id: pinned(self.faculty_id),
                ..ListScope::default()
            },
            UserRole::UnitAdmin | UserRole::UnitStaff => ListScope {
                unit_id: pinned(self.unit_id),
                ..ListScope::default()
            },
        }
    }
}

/// Optional organizational filters; `None` means unrestricted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListScope {
    pub unit_id: Option<Uuid>,
    pub faculty_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: UserRole,
    #[serde(default)]
    pub unit_id: Option<Uuid>,
    #[serde(default)]
    pub faculty_id: Option<Uuid>,
    #[serde(default)]
    pub warehouse_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            user_id: claims.sub,
            role: claims.role,
            unit_id: claims.unit_id,
            faculty_id: claims.faculty_id,
            warehouse_id: claims.warehouse_id,
        }
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("Missing or invalid Authorization header".to_string())
                .into_response();
        }
    };

    let claims = match decode_jwt(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(AuthUser::from(claims));

    next.run(request).await
}

/// Decode and validate JWT token
pub fn decode_jwt(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token_for(role: UserRole, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role,
            unit_id: Some(Uuid::new_v4()),
            faculty_id: None,
            warehouse_id: None,
            exp: now + exp_offset,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_valid_token() {
        let claims = decode_jwt(&token_for(UserRole::UnitStaff, 3600), SECRET).unwrap();
        assert_eq!(claims.role, UserRole::UnitStaff);
        assert!(claims.unit_id.is_some());
    }

    #[test]
    fn test_decode_expired_token() {
        let err = decode_jwt(&token_for(UserRole::UnitStaff, -3600), SECRET).unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }

    #[test]
    fn test_decode_wrong_secret() {
        let err = decode_jwt(&token_for(UserRole::UnitStaff, 3600), "other").unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn test_require_role() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::UnitStaff,
            unit_id: None,
            faculty_id: None,
            warehouse_id: None,
        };
        assert!(user.require_role(shared::RECEIPT_CONFIRMERS).is_ok());
        assert!(matches!(
            user.require_role(shared::DISTRIBUTION_MANAGERS),
            Err(AppError::InsufficientPermissions)
        ));
    }

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
            unit_id: Some(Uuid::new_v4()),
            faculty_id: Some(Uuid::new_v4()),
            warehouse_id: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn test_unit_roles_are_confined_to_their_unit() {
        let staff = user(UserRole::UnitStaff);
        let own_unit = staff.unit_id.unwrap();
        assert!(staff.covers_room(own_unit, Uuid::new_v4()));
        assert!(!staff.covers_room(Uuid::new_v4(), staff.faculty_id.unwrap()));
        assert!(!staff.covers_warehouse(staff.warehouse_id.unwrap(), None));
    }

    #[test]
    fn test_warehouse_staff_scope() {
        let staff = user(UserRole::WarehouseStaff);
        let own = staff.warehouse_id.unwrap();
        assert!(staff.covers_request(Uuid::new_v4(), Uuid::new_v4(), own));
        assert!(!staff.covers_request(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()));
        assert!(staff.covers_warehouse(own, None));
    }

    #[test]
    fn test_faculty_admin_needs_matching_warehouse_faculty() {
        let admin = user(UserRole::FacultyAdmin);
        assert!(admin.covers_warehouse(Uuid::new_v4(), admin.faculty_id));
        assert!(!admin.covers_warehouse(Uuid::new_v4(), None));
        assert!(!admin.covers_warehouse(Uuid::new_v4(), Some(Uuid::new_v4())));
    }

    #[test]
    fn test_list_scope() {
        assert_eq!(user(UserRole::SuperAdmin).list_scope(), ListScope::default());

        let staff = user(UserRole::UnitStaff);
        let scope = staff.list_scope();
        assert_eq!(scope.unit_id, staff.unit_id);
        assert_eq!(scope.faculty_id, None);

        let mut orphan = user(UserRole::FacultyAdmin);
        orphan.faculty_id = None;
        assert_eq!(orphan.list_scope().faculty_id, Some(Uuid::nil()));
    }
}
