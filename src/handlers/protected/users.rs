// handlers/protected/users.rs - User administration within the caller's organization
//
// Each handler states its guard first; the service then resolves rows through
// the tenant bound to the request.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::{any_of_roles, self_or_role, Principal, Role};
use crate::database::models::UserProfile;
use crate::error::{ApiError, ApiResult};
use crate::middleware::ValidJson;
use crate::services::{CreateUserRequest, UpdateUserRequest, UserService};
use crate::state::AppState;

fn service(state: &AppState) -> UserService {
    UserService::new(state.users.clone(), state.bcrypt_cost)
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid id: {}", raw)))
}

/// POST /users - ADMIN only
pub async fn create_user(
    State(state): State<AppState>,
    principal: Principal,
    ValidJson(payload): ValidJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    any_of_roles(Some(&principal), &[Role::Admin]).into_result()?;

    let created = service(&state).create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /users - ADMIN or DISPATCHER
pub async fn list_users(State(state): State<AppState>, principal: Principal) -> ApiResult<Json<Vec<UserProfile>>> {
    any_of_roles(Some(&principal), &[Role::Admin, Role::Dispatcher]).into_result()?;

    Ok(Json(service(&state).list().await?))
}

/// GET /users/:id - the user themself, or ADMIN
pub async fn get_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    self_or_role(Some(&principal), &id, Role::Admin).into_result()?;

    let user = service(&state).get(parse_id(&id)?).await?;
    Ok(Json(user.profile()))
}

/// PUT /users/:id - the user themself, or ADMIN
pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidJson(payload): ValidJson<UpdateUserRequest>,
) -> ApiResult<Json<UserProfile>> {
    self_or_role(Some(&principal), &id, Role::Admin).into_result()?;

    let updated = service(&state).update(&principal, parse_id(&id)?, payload).await?;
    Ok(Json(updated))
}

/// POST /users/:id/deactivate - ADMIN only
pub async fn deactivate_user(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    any_of_roles(Some(&principal), &[Role::Admin]).into_result()?;

    let deactivated = service(&state).deactivate(parse_id(&id)?).await?;
    Ok(Json(deactivated))
}
