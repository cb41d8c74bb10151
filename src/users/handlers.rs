use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Extension, Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{DeleteAccountResponse, UpdateProfileRequest};
use crate::{
    auth::{
        handlers::{is_valid_email, normalize_email},
        services::hash_password,
        repo_types::{UserChanges, UserProfile},
        Principal,
    },
    error::ApiError,
    state::AppState,
};

const USER_NOT_FOUND: &str = "User not found";

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(me).put(update_me).delete(delete_me))
}

#[instrument(skip(state, principal), fields(user_id = %principal.user_id))]
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state
        .users
        .get_profile(&principal.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
    Ok(Json(profile))
}

#[instrument(skip(state, principal, payload), fields(user_id = %principal.user_id))]
pub async fn update_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<UserProfile>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::validation(e.body_text()))?;

    let mut changes = UserChanges::default();
    if let Some(email) = payload.email {
        let email = normalize_email(&email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(ApiError::validation("Invalid email"));
        }
        if email != principal.email {
            changes.email = Some(email);
        }
    }
    if let Some(password) = payload.password {
        if password.is_empty() {
            return Err(ApiError::validation("Password is required"));
        }
        changes.password_hash = Some(hash_password(&password)?);
    }

    if changes.is_empty() {
        let profile = state
            .users
            .get_profile(&principal.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))?;
        return Ok(Json(profile));
    }

    let profile = state
        .users
        .update(&principal.user_id, &changes)
        .await
        .map_err(|e| ApiError::from_store(e, USER_NOT_FOUND))?;
    info!(email_changed = changes.email.is_some(), "profile updated");
    Ok(Json(profile))
}

/// Removes the caller's journal entries, then the account itself.
#[instrument(skip(state, principal), fields(user_id = %principal.user_id))]
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<DeleteAccountResponse>, ApiError> {
    let deleted_entries = state
        .journals
        .delete_all_for_owner(&principal.user_id)
        .await?;
    state
        .users
        .delete(&principal.user_id)
        .await
        .map_err(|e| ApiError::from_store(e, USER_NOT_FOUND))?;

    info!(deleted_entries, "account deleted");
    Ok(Json(DeleteAccountResponse {
        message: "Account deleted successfully",
        deleted_entries,
    }))
}
