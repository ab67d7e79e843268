//! Ceremony and session endpoints
//!
//! The protocol core exposes start/finish pairs for both ceremonies; these
//! handlers adapt them to JSON over HTTP and issue a session on any
//! verified ceremony. Session issuance receives the username and display
//! name and is otherwise opaque to the protocol.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tower_sessions::Session;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::Store;
use crate::validation;
use crate::webauthn::types::*;
use crate::webauthn::{authentication, registration};

fn session_error(e: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("Session error: {}", e))
}

/// Store the verified user's identity in the session
async fn issue_session(session: &Session, state: &AppState, username: &str) -> AppResult<()> {
    let username = validation::normalize_username(username)?;
    let user = state
        .store
        .get_user(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username)))?;

    session
        .insert("user_id", &user.id)
        .await
        .map_err(session_error)?;
    session
        .insert("username", &user.username)
        .await
        .map_err(session_error)?;
    session
        .insert("display_name", &user.display_name)
        .await
        .map_err(session_error)?;

    Ok(())
}

// Registration endpoints

pub async fn register_start(
    State(state): State<AppState>,
    Json(req): Json<RegisterStartRequest>,
) -> AppResult<Json<RegistrationOptions>> {
    let options =
        registration::start_registration(&state, &req.username, req.display_name.as_deref())
            .await?;

    Ok(Json(options))
}

pub async fn register_finish(
    session: Session,
    State(state): State<AppState>,
    Json(req): Json<RegisterFinishRequest>,
) -> AppResult<Json<VerificationResult>> {
    let result = registration::finish_registration(&state, &req.username, &req.credential).await?;

    if result.verified {
        issue_session(&session, &state, &req.username).await?;
    }

    Ok(Json(result))
}

// Authentication endpoints

pub async fn authenticate_start(
    State(state): State<AppState>,
    Json(req): Json<AuthenticateStartRequest>,
) -> AppResult<Json<AuthenticationOptions>> {
    let options = authentication::start_authentication(&state, &req.username).await?;

    Ok(Json(options))
}

pub async fn authenticate_finish(
    session: Session,
    State(state): State<AppState>,
    Json(req): Json<AuthenticateFinishRequest>,
) -> AppResult<Json<VerificationResult>> {
    let result =
        authentication::finish_authentication(&state, &req.username, &req.credential).await?;

    if result.verified {
        issue_session(&session, &state, &req.username).await?;
    }

    Ok(Json(result))
}

// Session management

pub async fn logout(session: Session) -> AppResult<Json<Value>> {
    session.delete().await.map_err(session_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Logged out successfully"
    })))
}

pub async fn session_info(session: Session) -> AppResult<Json<Value>> {
    let username: Option<String> = session.get("username").await.map_err(session_error)?;
    let display_name: Option<String> = session.get("display_name").await.map_err(session_error)?;

    match username {
        Some(username) => Ok(Json(json!({
            "authenticated": true,
            "username": username,
            "display_name": display_name,
        }))),
        None => Ok(Json(json!({
            "authenticated": false
        }))),
    }
}
