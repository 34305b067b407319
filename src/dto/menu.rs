use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::MenuItem;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMenuItemRequest {
    pub title: String,
    #[schema(value_type = String, example = "12.50")]
    pub price: Decimal,
    pub category_id: Uuid,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateMenuItemRequest {
    pub title: Option<String>,
    #[schema(value_type = Option<String>, example = "12.50")]
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub featured: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct MenuItemList {
    #[schema(value_type = Vec<MenuItem>)]
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeaturedToggled {
    pub id: Uuid,
    pub featured: bool,
}
