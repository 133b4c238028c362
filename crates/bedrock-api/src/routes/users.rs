//! Routes for the Identity bounded context.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bedrock_core::rng::SystemRng;
use bedrock_identity::application::command_handlers::{
    handle_create_user, handle_delete_user, handle_provision_user, handle_update_user,
};
use bedrock_identity::application::query_handlers::{self, UserView};
use bedrock_identity::domain::commands::{CreateUser, DeleteUser, ProvisionUser, UpdateUser};
use bedrock_identity::domain::value_objects::Role;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Request body for `POST /api/v1/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    #[serde(default)]
    pub admin: bool,
}

/// Request body for `POST /api/v1/users/provision`.
#[derive(Debug, Deserialize)]
pub struct ProvisionUserRequest {
    pub display_name: String,
    pub email: String,
}

/// Request body for `PATCH /api/v1/users/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub roles: Option<Vec<Role>>,
}

/// Query string for `GET /api/v1/users`.
#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// POST /api/v1/users
async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let command = CreateUser {
        correlation_id: Uuid::new_v4(),
        username: body.username,
        email: body.email,
        password: body.password,
        admin: body.admin,
    };
    let (user, events) = handle_create_user(
        &command,
        state.clock.as_ref(),
        state.passwords.as_ref(),
        state.users.as_ref(),
    )
    .await?;

    state.identity_events.enqueue(events);
    state.identity_events.dispatch_for(user.id).await?;

    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

/// POST /api/v1/users/provision
///
/// Responds `201` when an account was registered and `200` when one already
/// existed for the email.
async fn provision_user(
    State(state): State<AppState>,
    Json(body): Json<ProvisionUserRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let command = ProvisionUser {
        correlation_id: Uuid::new_v4(),
        display_name: body.display_name,
        email: body.email,
    };
    let mut rng = SystemRng::new();
    let (user, events) = handle_provision_user(
        &command,
        state.clock.as_ref(),
        &mut rng,
        state.users.as_ref(),
    )
    .await?;

    let status = if events.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    state.identity_events.enqueue(events);
    state.identity_events.dispatch_for(user.id).await?;

    Ok((status, Json(UserView::from(&user))))
}

/// GET /api/v1/users
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = query_handlers::list_users(
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        state.users.as_ref(),
    )
    .await?;
    Ok(Json(users))
}

/// GET /api/v1/users/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserView>, ApiError> {
    let user = query_handlers::get_user_by_id(user_id, state.users.as_ref()).await?;
    Ok(Json(user))
}

/// PATCH /api/v1/users/{id}
async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserView>, ApiError> {
    let command = UpdateUser {
        correlation_id: Uuid::new_v4(),
        user_id,
        username: body.username,
        email: body.email,
        password: body.password,
        roles: body.roles,
    };
    let user = handle_update_user(
        &command,
        state.clock.as_ref(),
        state.passwords.as_ref(),
        state.users.as_ref(),
    )
    .await?;
    Ok(Json(UserView::from(&user)))
}

/// DELETE /api/v1/users/{id}
///
/// Files owned by the user are removed before the account itself.
async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = DeleteUser {
        correlation_id: Uuid::new_v4(),
        user_id,
    };
    handle_delete_user(
        &command,
        state.clock.as_ref(),
        state.users.as_ref(),
        &state.identity_events,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for the identity context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/provision", post(provision_user))
        .route(
            "/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}
