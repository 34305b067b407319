use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartCleared, CartList},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        menu_items::Entity as MenuItems,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, CartMenuItem},
    money,
    policy::{self, Action, Target},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(FromRow)]
struct CartWithMenuItemRow {
    menu_item_id: Uuid,
    title: String,
    menu_price: Decimal,
    quantity: i32,
    unit_price: Decimal,
    price: Decimal,
}

/// Line price of a cart entry.
pub fn line_price(quantity: i32, unit_price: Decimal) -> Decimal {
    Decimal::from(quantity) * unit_price
}

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    policy::ensure(user, Action::ReadCart, Target::owned_by(user.user_id))?;

    let rows = sqlx::query_as::<_, CartWithMenuItemRow>(
        r#"
        SELECT ci.menu_item_id, m.title, m.price AS menu_price,
               ci.quantity, ci.unit_price, ci.price
        FROM cart_items ci
        JOIN menu_items m ON m.id = ci.menu_item_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<CartItem> = rows
        .into_iter()
        .map(|row| CartItem {
            menuitem: CartMenuItem {
                id: row.menu_item_id,
                title: row.title,
                price: row.menu_price,
            },
            quantity: row.quantity,
            unit_price: row.unit_price,
            price: row.price,
        })
        .collect();

    let meta = Meta::unpaged(items.len());
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    policy::ensure(user, Action::AddToCart, Target::owned_by(user.user_id))?;
    if payload.quantity < 1 {
        return Err(AppError::BadRequest(
            "quantity must be at least 1".to_string(),
        ));
    }

    let menu_item = MenuItems::find_by_id(payload.menuitem)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Menu item"))?;

    let price = line_price(payload.quantity, menu_item.price);
    money::ensure_storable(price, "line price")?;
    let entry = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        menu_item_id: Set(menu_item.id),
        quantity: Set(payload.quantity),
        unit_price: Set(menu_item.price),
        price: Set(price),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "Item is already in cart"))?;

    tracing::info!(
        user_id = %user.user_id,
        menu_item_id = %entry.menu_item_id,
        quantity = entry.quantity,
        "cart item added"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "menu_item_id": entry.menu_item_id, "quantity": entry.quantity }),
    )
    .await;

    Ok(ApiResponse::success(
        "Item added to cart",
        CartItem {
            menuitem: CartMenuItem {
                id: menu_item.id,
                title: menu_item.title,
                price: menu_item.price,
            },
            quantity: entry.quantity,
            unit_price: entry.unit_price,
            price: entry.price,
        },
        Some(Meta::empty()),
    ))
}

/// Remove one entry when `menu_item_id` is given, otherwise clear the cart.
pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    menu_item_id: Option<Uuid>,
) -> AppResult<ApiResponse<CartCleared>> {
    policy::ensure(user, Action::RemoveFromCart, Target::owned_by(user.user_id))?;

    let mut condition = Condition::all().add(CartCol::UserId.eq(user.user_id));
    if let Some(menu_item_id) = menu_item_id {
        condition = condition.add(CartCol::MenuItemId.eq(menu_item_id));
    }

    let result = CartItems::delete_many()
        .filter(condition)
        .exec(&state.orm)
        .await?;

    if menu_item_id.is_some() && result.rows_affected == 0 {
        return Err(AppError::NotFound("Cart item"));
    }

    tracing::info!(
        user_id = %user.user_id,
        menu_item_id = ?menu_item_id,
        removed = result.rows_affected,
        "cart items removed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "menu_item_id": menu_item_id, "removed": result.rows_affected }),
    )
    .await;

    let message = if menu_item_id.is_some() {
        "Item was removed from cart"
    } else {
        "All items were removed from cart"
    };
    Ok(ApiResponse::success(
        message,
        CartCleared {
            removed: result.rows_affected,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::line_price;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn line_price_is_quantity_times_unit_price() {
        let unit = Decimal::from_str("10.00").unwrap();
        assert_eq!(line_price(2, unit), Decimal::from_str("20.00").unwrap());
        let unit = Decimal::from_str("0.10").unwrap();
        assert_eq!(line_price(3, unit), Decimal::from_str("0.30").unwrap());
    }
}
