//! User-verification mode endpoints
//!
//! GET returns the current mode and lock state; POST changes the mode and
//! fails with 403 once the mode has been locked.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::state::AppState;
use crate::webauthn::policy::UvMode;

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: UvMode,
}

pub async fn get_mode(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "mode": state.policy.mode(),
        "locked": state.policy.is_locked(),
    }))
}

pub async fn set_mode(
    State(state): State<AppState>,
    Json(req): Json<SetModeRequest>,
) -> AppResult<Json<Value>> {
    state.policy.set_mode(req.mode)?;
    tracing::info!(mode = req.mode.as_str(), "user-verification mode changed");

    Ok(Json(json!({
        "mode": req.mode,
        "locked": state.policy.is_locked(),
    })))
}
