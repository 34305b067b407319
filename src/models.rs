use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MenuItem {
    pub id: Uuid,
    pub title: String,
    #[schema(value_type = String, example = "12.50")]
    pub price: Decimal,
    pub featured: bool,
    pub category: Category,
}

/// The slice of a menu item shown inside a cart line.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CartMenuItem {
    pub id: Uuid,
    pub title: String,
    #[schema(value_type = String, example = "12.50")]
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CartItem {
    pub menuitem: CartMenuItem,
    pub quantity: i32,
    #[schema(value_type = String, example = "12.50")]
    pub unit_price: Decimal,
    #[schema(value_type = String, example = "25.00")]
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_crew_id: Option<Uuid>,
    /// `false` while pending, `true` once delivered.
    pub status: bool,
    #[schema(value_type = String, example = "25.00")]
    pub total: Decimal,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct OrderItem {
    pub menu_item_id: Uuid,
    pub title: String,
    pub quantity: i32,
    #[schema(value_type = String, example = "12.50")]
    pub unit_price: Decimal,
    #[schema(value_type = String, example = "25.00")]
    pub price: Decimal,
}
