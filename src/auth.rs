//! Authentication collaborator: issues and verifies signed tokens carrying
//! user identity and role. The reconciliation engine trusts the identity it
//! is handed and performs no authorization logic of its own.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (username)
    pub role: String, // Role attached at issue time
    pub jti: String,  // Unique token id
    pub iat: i64,     // Issued at
    pub exp: i64,     // Expiration
    pub iss: String,  // Issuer
}

/// Authenticated caller identity injected into request extensions by the
/// auth middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub role: String,
}

/// Operator credentials accepted by the login endpoint. User storage and
/// password hashing live outside this system.
#[derive(Debug, Clone)]
struct OperatorCredentials {
    username: String,
    password: String,
    role: String,
}

/// Service issuing and verifying JWTs.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    token_ttl_secs: i64,
    operator: OperatorCredentials,
}

impl AuthService {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            issuer: cfg.auth_issuer.clone(),
            token_ttl_secs: cfg.jwt_expiration as i64,
            operator: OperatorCredentials {
                username: cfg.operator_username.clone(),
                password: cfg.operator_password.clone(),
                role: cfg.operator_role.clone(),
            },
        }
    }

    /// Issues a signed token for the given identity.
    pub fn issue_token(&self, username: &str, role: &str) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            role: role.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.token_ttl_secs,
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::AuthError(format!("Failed to issue token: {}", e)))
    }

    /// Verifies a token's signature, expiry, and issuer.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.clone()]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| ServiceError::Unauthorized(format!("Invalid token: {}", e)))
    }

    fn check_credentials(&self, username: &str, password: &str) -> Option<(String, String)> {
        if username == self.operator.username && password == self.operator.password {
            Some((self.operator.username.clone(), self.operator.role.clone()))
        } else {
            None
        }
    }
}

/// Middleware requiring a valid bearer token; injects `AuthenticatedUser`
/// into request extensions for downstream handlers.
pub async fn require_auth(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = auth.verify_token(token)?;
    debug!(user = %claims.sub, "Request authenticated");

    req.extensions_mut().insert(AuthenticatedUser {
        username: claims.sub,
        role: claims.role,
    });

    Ok(next.run(req).await)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    pub username: String,
    pub role: String,
}

/// Routes served under `/auth`.
pub fn auth_routes() -> Router<Arc<AuthService>> {
    Router::new()
        .route("/login", post(login))
        .route("/verify", get(verify))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(auth): State<Arc<AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let (username, role) = auth
        .check_credentials(&payload.username, &payload.password)
        .ok_or_else(|| ServiceError::Unauthorized("Invalid username or password".to_string()))?;

    let token = auth.issue_token(&username, &role)?;

    Ok(Json(LoginResponse {
        token,
        username,
        role,
    }))
}

#[utoipa::path(
    get,
    path = "/auth/verify",
    responses(
        (status = 200, description = "Token valid", body = VerifyResponse),
        (status = 401, description = "Token missing or invalid", body = crate::errors::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn verify(
    State(auth): State<Arc<AuthService>>,
    req: Request,
) -> Result<Json<VerifyResponse>, ServiceError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = auth.verify_token(token)?;

    Ok(Json(VerifyResponse {
        username: claims.sub,
        role: claims.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        );
        AuthService::from_config(&cfg)
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let auth = test_service();
        let token = auth.issue_token("dispatcher", "admin").unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "dispatcher");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.iss, "dispatch-api");
    }

    #[test]
    fn garbage_token_is_rejected() {
        let auth = test_service();
        assert!(matches!(
            auth.verify_token("not-a-token"),
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let auth = test_service();

        let mut other_cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "a_completely_different_secret_key_of_enough_length".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        );
        other_cfg.auth_issuer = "dispatch-api".to_string();
        let other = AuthService::from_config(&other_cfg);

        let token = other.issue_token("dispatcher", "admin").unwrap();
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn credentials_check_matches_configured_operator() {
        let auth = test_service();
        assert!(auth.check_credentials("admin", "admin").is_some());
        assert!(auth.check_credentials("admin", "wrong").is_none());
        assert!(auth.check_credentials("intruder", "admin").is_none());
    }
}
