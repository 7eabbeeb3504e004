// handlers/public/login.rs - POST /auth/login

use axum::{extract::State, Json};

use crate::error::ApiResult;
use crate::middleware::ValidJson;
use crate::services::{AuthService, LoginRequest, LoginResponse};
use crate::state::AppState;

/// POST /auth/login - Exchange credentials for a session token
///
/// Expected Input:
/// ```json
/// {
///   "email": "admin@acme.com",
///   "password": "admin123",
///   "subdomain": "acme"            // or "organizationId": "<uuid>", never both
/// }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "accessToken": "eyJhbGciOiJIUzI1NiI...",
///   "expiresIn": 86400000,
///   "user": { "id": "...", "email": "...", "fullName": "...", "role": "ADMIN", "active": true }
/// }
/// ```
///
/// `expiresIn` is an upper bound: the token's `exp` is whole seconds counted
/// from the start of the issuing second, so it may lapse up to 999 ms early.
///
/// 400 for missing credentials or a missing/contradictory organization
/// selector, 401 for anything wrong with the credentials themselves.
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let response = AuthService::from_state(&state).login(payload).await?;
    Ok(Json(response))
}
