//! Authentication endpoints: signup, email verification, signin, refresh,
//! signout and password reset

use axum::{Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::db;
use crate::email;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util::{generate_code, hash_password, now_millis, verify_password};

use super::{ApiResult, internal};

const CODE_TTL_MS: i64 = 10 * 60 * 1000;
const MAX_CODE_ATTEMPTS: i32 = 3;
const REFRESH_COOKIE: &str = "refresh_token";

fn refresh_cookie(token: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .path("/auth")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(30))
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .path("/auth")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::ZERO)
        .build()
}

// ── Signup and email verification ──

#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<serde_json::Value> {
    let email_addr = req.email.trim().to_lowercase();
    let name = req.name.trim();

    if name.is_empty() || !email_addr.contains('@') {
        return Err(AppError::validation("Name and a valid email are required"));
    }
    if req.password.len() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooShort));
    }

    if db::users::find_by_email(&state.pool, &email_addr)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err(AppError::with_message(
            ErrorCode::AlreadyExists,
            "An account with this email already exists",
        ));
    }

    let password_hash = hash_password(&req.password).map_err(internal)?;
    db::users::create(&state.pool, name, &email_addr, &password_hash)
        .await
        .map_err(internal)?;

    send_signup_code(&state, &email_addr).await?;

    Ok(Json(serde_json::json!({
        "message": "Account created, check your email for the verification code"
    })))
}

async fn send_signup_code(state: &AppState, email_addr: &str) -> Result<(), AppError> {
    let code = generate_code();
    let code_hash = hash_password(&code).map_err(internal)?;
    let now = now_millis();

    db::email_verifications::upsert(
        &state.pool,
        email_addr,
        "signup",
        &code_hash,
        now + CODE_TTL_MS,
        now,
    )
    .await
    .map_err(internal)?;

    let _ = email::send_verification_code(&state.ses, &state.ses_from_email, email_addr, &code)
        .await
        .map_err(|e| tracing::warn!("Failed to send verification code: {e}"));

    Ok(())
}

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

/// POST /auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<serde_json::Value> {
    let email_addr = req.email.trim().to_lowercase();

    let record = db::email_verifications::find(&state.pool, &email_addr, "signup")
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::VerificationCodeInvalid))?;

    if now_millis() > record.expires_at {
        return Err(AppError::new(ErrorCode::VerificationCodeExpired));
    }
    if record.attempts >= MAX_CODE_ATTEMPTS {
        return Err(AppError::new(ErrorCode::TooManyAttempts));
    }

    db::email_verifications::increment_attempts(&state.pool, &email_addr, "signup")
        .await
        .map_err(internal)?;

    if !verify_password(&req.code, &record.code_hash) {
        return Err(AppError::new(ErrorCode::VerificationCodeInvalid));
    }

    db::users::mark_verified(&state.pool, &email_addr)
        .await
        .map_err(internal)?;
    let _ = db::email_verifications::delete(&state.pool, &email_addr, "signup").await;

    Ok(Json(serde_json::json!({ "message": "Email verified" })))
}

#[derive(Deserialize)]
pub struct ResendCodeRequest {
    pub email: String,
}

/// POST /auth/resend-code
pub async fn resend_code(
    State(state): State<AppState>,
    Json(req): Json<ResendCodeRequest>,
) -> ApiResult<serde_json::Value> {
    let email_addr = req.email.trim().to_lowercase();

    // Always return OK to prevent email enumeration
    if let Ok(Some(user)) = db::users::find_by_email(&state.pool, &email_addr).await
        && !user.is_verified
    {
        send_signup_code(&state, &email_addr).await?;
    }

    Ok(Json(serde_json::json!({
        "message": "If the account exists, a new code has been sent"
    })))
}

// ── Signin / refresh / signout ──

#[derive(Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(serde::Serialize)]
pub struct SigninResponse {
    pub token: String,
    pub user: db::users::User,
}

/// POST /auth/signin
pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SigninRequest>,
) -> Result<(CookieJar, axum::Json<SigninResponse>), AppError> {
    let email_addr = req.email.trim().to_lowercase();

    let user = db::users::find_by_email(&state.pool, &email_addr)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::InvalidCredentials))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(AppError::new(ErrorCode::InvalidCredentials));
    }
    if !user.is_verified {
        return Err(AppError::new(ErrorCode::EmailNotVerified));
    }

    let token = crate::auth::jwt::create_access_token(&user.id, &user.role, &state.jwt_secret)
        .map_err(internal)?;
    let refresh = db::refresh_tokens::create(&state.pool, &user.id)
        .await
        .map_err(internal)?;

    Ok((
        jar.add(refresh_cookie(refresh)),
        Json(SigninResponse { token, user }),
    ))
}

#[derive(serde::Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// POST /auth/refresh — rotate the refresh cookie and mint a new access token
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, axum::Json<RefreshResponse>), AppError> {
    let old_token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::new(ErrorCode::NotAuthenticated))?;

    let (user_id, new_refresh) = db::refresh_tokens::rotate(&state.pool, &old_token)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::TokenExpired))?;

    let user = db::users::find_by_id(&state.pool, &user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::TokenInvalid))?;

    let token = crate::auth::jwt::create_access_token(&user.id, &user.role, &state.jwt_secret)
        .map_err(internal)?;

    Ok((
        jar.add(refresh_cookie(new_refresh)),
        Json(RefreshResponse { token }),
    ))
}

/// POST /auth/signout — revoke the refresh token and clear the cookie
pub async fn signout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, axum::Json<serde_json::Value>), AppError> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        let _ = db::refresh_tokens::revoke(&state.pool, cookie.value()).await;
    }

    Ok((
        jar.add(removal_cookie()),
        Json(serde_json::json!({ "message": "Signed out" })),
    ))
}

// ── Password reset ──

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// POST /auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<serde_json::Value> {
    let email_addr = req.email.trim().to_lowercase();

    // Always return OK to prevent email enumeration
    if let Ok(Some(_)) = db::users::find_by_email(&state.pool, &email_addr).await {
        let code = generate_code();
        let code_hash = hash_password(&code).map_err(internal)?;
        let now = now_millis();

        let _ = db::email_verifications::upsert(
            &state.pool,
            &email_addr,
            "password_reset",
            &code_hash,
            now + CODE_TTL_MS,
            now,
        )
        .await;

        let _ = email::send_password_reset_code(
            &state.ses,
            &state.ses_from_email,
            &email_addr,
            &code,
        )
        .await;
    }

    Ok(Json(serde_json::json!({
        "message": "If the email exists, a reset code has been sent"
    })))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// POST /auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<serde_json::Value> {
    let email_addr = req.email.trim().to_lowercase();

    if req.new_password.len() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooShort));
    }

    let record = db::email_verifications::find(&state.pool, &email_addr, "password_reset")
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::VerificationCodeInvalid))?;

    if now_millis() > record.expires_at {
        return Err(AppError::new(ErrorCode::VerificationCodeExpired));
    }
    if record.attempts >= MAX_CODE_ATTEMPTS {
        return Err(AppError::new(ErrorCode::TooManyAttempts));
    }

    db::email_verifications::increment_attempts(&state.pool, &email_addr, "password_reset")
        .await
        .map_err(internal)?;

    if !verify_password(&req.code, &record.code_hash) {
        return Err(AppError::new(ErrorCode::VerificationCodeInvalid));
    }

    let user = db::users::find_by_email(&state.pool, &email_addr)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::NotFound))?;

    let hashed = hash_password(&req.new_password).map_err(internal)?;
    db::users::update_password(&state.pool, &user.id, &hashed)
        .await
        .map_err(internal)?;

    // Existing sessions are invalidated along with the old password
    let _ = db::refresh_tokens::revoke_all(&state.pool, &user.id).await;
    let _ = db::email_verifications::delete(&state.pool, &email_addr, "password_reset").await;

    Ok(Json(
        serde_json::json!({ "message": "Password has been reset" }),
    ))
}
