use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
};
// password hashing (argon2)
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::{NewUser, User, UserSettings};
use crate::routes::AppState;
use crate::services::{json_body, present};

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterReq>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let req = json_body(payload)?;
    let name = present(req.name).ok_or_else(|| ApiError::validation("name es requerido"))?;
    let email = present(req.email).ok_or_else(|| ApiError::validation("email es requerido"))?;
    let password =
        present(req.password).ok_or_else(|| ApiError::validation("password es requerido"))?;

    let password_hash = hash_password(&password)
        .map_err(|e| ApiError::Infrastructure(format!("hash error: {e}")))?;
    let user = state
        .store
        .create_user(NewUser {
            name,
            email,
            phone: req.phone,
            password_hash,
            settings: req.settings.map(SettingsReq::resolve).unwrap_or_default(),
        })
        .await?;
    tracing::info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginReq>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let req = json_body(payload)?;
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(ApiError::validation("Email y password requeridos"));
    };

    let Some(creds) = state.store.find_credentials(&email).await? else {
        return Err(ApiError::Unauthorized("Usuario no encontrado".to_string()));
    };
    let is_valid = verify_password(&password, &creds.password_hash)
        .map_err(|e| ApiError::Infrastructure(format!("verify error: {e}")))?;
    if !is_valid {
        return Err(ApiError::Unauthorized("Contraseña incorrecta".to_string()));
    }
    Ok(Json(creds.user))
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Constant-time check of `password` against a PHC-formatted argon2 hash.
pub fn verify_password(
    password: &str,
    stored_hash: &str,
) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(stored_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Deserialize)]
pub struct RegisterReq {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub settings: Option<SettingsReq>,
}

/// Partial settings; omitted fields keep their defaults.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsReq {
    pub language: Option<String>,
    pub currency: Option<String>,
    pub notifications_enabled: Option<bool>,
}

impl SettingsReq {
    fn resolve(self) -> UserSettings {
        let d = UserSettings::default();
        UserSettings {
            language: self.language.unwrap_or(d.language),
            currency: self.currency.unwrap_or(d.currency),
            notifications_enabled: self.notifications_enabled.unwrap_or(d.notifications_enabled),
        }
    }
}

#[derive(Deserialize)]
pub struct LoginReq {
    pub email: Option<String>,
    pub password: Option<String>,
}
