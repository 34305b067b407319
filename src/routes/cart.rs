use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartCleared, CartList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::CartItem,
    response::ApiResponse,
    routes::params::RemoveFromCartQuery,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/menu-items",
        get(cart_list).post(add_to_cart).delete(remove_from_cart),
    )
}

#[utoipa::path(
    get,
    path = "/api/cart/menu-items",
    responses(
        (status = 200, description = "List cart items for current user", body = ApiResponse<CartList>),
        (status = 401, description = "Authentication required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let resp = cart_service::list_cart(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/menu-items",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Item added to cart", body = ApiResponse<CartItem>),
        (status = 400, description = "Quantity must be at least 1"),
        (status = 404, description = "Menu item not found"),
        (status = 409, description = "Item is already in cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CartItem>>)> {
    let resp = cart_service::add_to_cart(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/cart/menu-items",
    params(
        ("menuitem" = Option<Uuid>, Query, description = "Menu item to remove; omit to clear the cart")
    ),
    responses(
        (status = 200, description = "Removed", body = ApiResponse<CartCleared>),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RemoveFromCartQuery>,
) -> AppResult<Json<ApiResponse<CartCleared>>> {
    let resp = cart_service::remove_from_cart(&state, &user, query.menuitem).await?;
    Ok(Json(resp))
}
