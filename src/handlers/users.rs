//! # User Handlers
//!
//! Profile endpoint for the authenticated user and a demo-grade listing of
//! all registered accounts.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tower_sessions::Session;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::Store;

/// Get the current authenticated user's profile
///
/// ## Route
/// GET /api/users/me (protected by the require_auth middleware)
///
/// Credential ids and public keys are not returned; only profile data and
/// per-credential metadata safe to show the account owner.
pub async fn get_current_user(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Value>> {
    let username: String = session
        .get("username")
        .await
        .map_err(|e| AppError::Internal(format!("Session error: {}", e)))?
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

    let user = state
        .store
        .get_user(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username)))?;

    Ok(Json(json!({
        "id": user.id,
        "username": user.username,
        "display_name": user.display_name,
        "created_at": user.created_at,
        "credentials": user.credentials.iter().map(|c| json!({
            "device_type": c.device_type,
            "backed_up": c.backed_up,
            "transports": c.transports,
            "created_at": c.created_at,
            "last_used_at": c.last_used_at,
        })).collect::<Vec<_>>(),
    })))
}

/// List all registered accounts
///
/// ## Route
/// GET /api/users
///
/// Demo convenience: shows who is registered and how many keys each
/// account holds.
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let users = state.store.list_users().await?;

    Ok(Json(json!({
        "users": users.iter().map(|u| json!({
            "username": u.username,
            "display_name": u.display_name,
            "credentials": u.credentials.len(),
            "created_at": u.created_at,
        })).collect::<Vec<_>>(),
    })))
}
