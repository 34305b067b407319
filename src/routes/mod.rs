use axum::Router;

use crate::state::AppState;

pub mod cart;
pub mod categories;
pub mod doc;
pub mod groups;
pub mod health;
pub mod menu_items;
pub mod orders;
pub mod params;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/menu-items", menu_items::router())
        .nest("/categories", categories::router())
        .nest("/groups", groups::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
}
