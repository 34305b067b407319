use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::groups::{GroupMembershipRequest, UserList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::group_service::{self, StaffGroup},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/manager/users",
            get(list_managers).post(add_manager).delete(remove_manager),
        )
        .route(
            "/delivery-crew/users",
            get(list_delivery_crew)
                .post(add_delivery_crew)
                .delete(remove_delivery_crew),
        )
}

/// Membership bodies are optional JSON; an absent body means no username.
fn membership_payload(body: &Bytes) -> AppResult<GroupMembershipRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GroupMembershipRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))
}

#[utoipa::path(
    get,
    path = "/api/groups/manager/users",
    responses(
        (status = 200, description = "List managers", body = ApiResponse<UserList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn list_managers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = group_service::list_members(&state, &user, StaffGroup::Manager).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/groups/manager/users",
    request_body = GroupMembershipRequest,
    responses(
        (status = 201, description = "User added to manager group", body = ApiResponse<User>),
        (status = 400, description = "Username is required"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User or group not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn add_manager(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let payload = membership_payload(&body)?;
    let resp = group_service::add_member(&state, &user, StaffGroup::Manager, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/groups/manager/users",
    request_body = GroupMembershipRequest,
    responses(
        (status = 200, description = "User removed from manager group", body = ApiResponse<User>),
        (status = 400, description = "Username is required"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User or group not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn remove_manager(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> AppResult<Json<ApiResponse<User>>> {
    let payload = membership_payload(&body)?;
    let resp = group_service::remove_member(&state, &user, StaffGroup::Manager, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/groups/delivery-crew/users",
    responses(
        (status = 200, description = "List delivery crew", body = ApiResponse<UserList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn list_delivery_crew(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = group_service::list_members(&state, &user, StaffGroup::DeliveryCrew).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/groups/delivery-crew/users",
    request_body = GroupMembershipRequest,
    responses(
        (status = 201, description = "User added to delivery crew", body = ApiResponse<User>),
        (status = 400, description = "Username is required"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User or group not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn add_delivery_crew(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let payload = membership_payload(&body)?;
    let resp =
        group_service::add_member(&state, &user, StaffGroup::DeliveryCrew, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/groups/delivery-crew/users",
    request_body = GroupMembershipRequest,
    responses(
        (status = 200, description = "User removed from delivery crew", body = ApiResponse<User>),
        (status = 400, description = "Username is required"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User or group not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn remove_delivery_crew(
    State(state): State<AppState>,
    user: AuthUser,
    body: Bytes,
) -> AppResult<Json<ApiResponse<User>>> {
    let payload = membership_payload(&body)?;
    let resp =
        group_service::remove_member(&state, &user, StaffGroup::DeliveryCrew, payload).await?;
    Ok(Json(resp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_means_no_username() {
        let payload = membership_payload(&Bytes::new()).unwrap();
        assert!(payload.username.is_none());
    }

    #[test]
    fn json_body_is_parsed() {
        let payload = membership_payload(&Bytes::from_static(br#"{"username":"alice"}"#)).unwrap();
        assert_eq!(payload.username.as_deref(), Some("alice"));
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let err = membership_payload(&Bytes::from_static(b"{username")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
