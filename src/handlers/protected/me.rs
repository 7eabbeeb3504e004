// handlers/protected/me.rs - GET /auth/me

use axum::{extract::State, Json};

use crate::auth::Principal;
use crate::database::models::UserProfile;
use crate::error::ApiResult;
use crate::services::AuthService;
use crate::state::AppState;

/// GET /auth/me - Profile of the user the bearer token was issued to
pub async fn me(State(state): State<AppState>, principal: Principal) -> ApiResult<Json<UserProfile>> {
    let profile = AuthService::from_state(&state).current_profile(&principal).await?;
    Ok(Json(profile))
}
