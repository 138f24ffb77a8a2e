use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::errors::AppError;
use crate::models::Admin;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let admin = {
        let db = state.db.lock().unwrap();
        auth::authenticate(&db, &body.username, &body.password)?
    };

    let access_token = auth::issue_token(&state.config.secret_key, &admin.username)?;

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer",
    }))
}

// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Admin>, AppError> {
    let db = state.db.lock().unwrap();
    let admin = auth::require_admin(&headers, &state.config.secret_key, &db)?;
    Ok(Json(admin))
}
