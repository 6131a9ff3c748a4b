//! JWT authentication for the storefront and admin APIs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

/// JWT claims for user authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    /// User ID
    pub sub: String,
    /// Role: customer | admin
    pub role: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated user identity extracted from JWT
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: String,
    pub role: String,
}

impl UserIdentity {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// Create a short-lived access token for a user
pub fn create_access_token(
    user_id: &str,
    role: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = UserClaims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (now + chrono::Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Decode and validate an access token
pub fn decode_access_token(
    token: &str,
    secret: &str,
) -> Result<UserClaims, jsonwebtoken::errors::Error> {
    let validation = Validation::default();
    jsonwebtoken::decode::<UserClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

/// Middleware that extracts and verifies the user JWT from the Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::new(ErrorCode::NotAuthenticated).into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::new(ErrorCode::TokenInvalid).into_response())?;

    let claims = decode_access_token(token, &state.jwt_secret).map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        let code = match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ErrorCode::TokenExpired,
            _ => ErrorCode::TokenInvalid,
        };
        AppError::new(code).into_response()
    })?;

    let identity = UserIdentity {
        user_id: claims.sub,
        role: claims.role,
    };

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Middleware that requires the authenticated user to be an admin.
/// Must run after `auth_middleware`.
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, Response> {
    let is_admin = request
        .extensions()
        .get::<UserIdentity>()
        .is_some_and(|id| id.is_admin());

    if !is_admin {
        return Err(AppError::new(ErrorCode::AdminRequired).into_response());
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let token = create_access_token("user-1", "customer", "test-secret").unwrap();
        let claims = decode_access_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, "customer");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_access_token("user-1", "customer", "test-secret").unwrap();
        assert!(decode_access_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = create_access_token("user-1", "customer", "test-secret").unwrap();
        let tampered = format!("{token}x");
        assert!(decode_access_token(&tampered, "test-secret").is_err());
    }

    #[test]
    fn test_identity_admin_check() {
        let admin = UserIdentity {
            user_id: "u".into(),
            role: "admin".into(),
        };
        let customer = UserIdentity {
            user_id: "u".into(),
            role: "customer".into(),
        };
        assert!(admin.is_admin());
        assert!(!customer.is_admin());
    }
}
