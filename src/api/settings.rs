//! Profile settings.
//!
//! - GET `/settings` - Profile of the current user
//! - POST `/settings` - Edit name, email, birthday or password

use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Deserialize;
use tracing::info;

use super::error::{ApiError, ResultExt, validate_email};
use crate::auth::{CsrfProtected, SessionAuth};
use crate::authority::{CsrfAuthority, SessionAuthority};
use crate::db::{Database, ProfileUpdate};
use crate::{impl_has_csrf, impl_has_sessions};

#[derive(Clone)]
pub struct SettingsState {
    pub db: Database,
    pub sessions: Arc<SessionAuthority>,
    pub csrf: Arc<CsrfAuthority>,
}

impl_has_sessions!(SettingsState);
impl_has_csrf!(SettingsState);

pub fn router(state: SettingsState) -> Router {
    Router::new()
        .route("/settings", get(get_settings).post(edit_settings))
        .with_state(state)
}

async fn get_settings(
    State(state): State<SettingsState>,
    SessionAuth(user): SessionAuth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .db
        .users()
        .get_profile(&user.login)
        .await
        .db_err("Failed to get profile")?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;
    Ok(Json(profile))
}

/// Empty strings leave the field unchanged.
#[derive(Deserialize)]
struct EditSettingsRequest {
    name: Option<String>,
    email: Option<String>,
    birthday: Option<String>,
    password: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn edit_settings(
    State(state): State<SettingsState>,
    SessionAuth(user): SessionAuth,
    _csrf: CsrfProtected,
    Json(payload): Json<EditSettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = ProfileUpdate {
        name: non_empty(&payload.name),
        email: non_empty(&payload.email),
        birth_date: non_empty(&payload.birthday),
        password: payload.password.as_deref().filter(|p| !p.is_empty()),
    };

    if let Some(email) = update.email {
        validate_email(email)?;
    }

    let users = state.db.users();
    if let Some(password) = update.password {
        let unchanged = users
            .verify_credentials(&user.login, password)
            .await
            .db_err("Failed to check password")?
            .is_some();
        if unchanged {
            return Err(ApiError::conflict("New password matches the current one"));
        }
    }

    if !users
        .edit_profile(&user.login, &update)
        .await
        .db_err("Failed to edit profile")?
    {
        return Err(ApiError::not_found("Account not found"));
    }

    info!(login = %user.login, "Profile updated");

    let profile = users
        .get_profile(&user.login)
        .await
        .db_err("Failed to get profile")?
        .ok_or_else(|| ApiError::not_found("Account not found"))?;
    Ok(Json(profile))
}
