use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, extract::State};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use roost_db::models::UserRow;
use roost_db::timestamp;
use roost_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use roost_types::models::User;

use crate::convert;
use crate::error::ApiError;
use crate::extract::Json;
use crate::state::{AppState, blocking};

const TOKEN_TTL_HOURS: i64 = 24;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Name is required"));
    }
    let email = req.email.trim().to_lowercase();
    if !looks_like_email(&email) {
        return Err(ApiError::Validation("Invalid email address"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation("Password must be at least 8 characters"));
    }

    let user_id = Uuid::new_v4();
    let now = timestamp(&Utc::now());
    let token_email = email.clone();

    blocking(&state, move |db| {
        if db.get_user_by_email(&email)?.is_some() {
            return Err(ApiError::Conflict("Email already registered"));
        }

        // Hash password with Argon2id
        let password_hash = hash_password(&req.password)?;

        let row = UserRow {
            id: user_id.to_string(),
            name,
            email,
            password: password_hash,
            phone: req.phone.trim().to_string(),
            location: req.location.trim().to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        // The UNIQUE email index settles a race with a concurrent signup.
        if !db.create_user(&row)? {
            return Err(ApiError::Conflict("Email already registered"));
        }
        Ok(())
    })
    .await?;

    info!("Registered user {}", user_id);
    let token = create_token(&state.jwt_secret, user_id, &token_email)?;

    Ok(Json(AuthResponse {
        message: "User registered successfully".into(),
        token,
        user_id,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();

    let user = blocking(&state, move |db| {
        let user = db
            .get_user_by_email(&email)?
            .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored password hash for {} is invalid: {}", user.id, e))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized("Invalid credentials"))?;

        Ok(user)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|_| anyhow::anyhow!("corrupt user id {}", user.id))?;
    let token = create_token(&state.jwt_secret, user_id, &user.email)?;

    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        token,
        user_id,
    }))
}

/// The account behind the bearer token.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<User>, ApiError> {
    let user_id = claims.sub.to_string();
    let row = blocking(&state, move |db| {
        db.get_user_by_id(&user_id)?
            .ok_or(ApiError::NotFound("User not found"))
    })
    .await?;
    Ok(Json(convert::user(row)))
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(looks_like_email("hen@farm.example"));
        assert!(!looks_like_email("hen.farm.example"));
        assert!(!looks_like_email("@farm.example"));
        assert!(!looks_like_email("hen@farm"));
        assert!(!looks_like_email("hen@@farm.example"));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"correct horse", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong horse", &parsed).is_err());
    }
}
