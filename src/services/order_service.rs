use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{AssignDeliveryCrewRequest, OrderList, OrderStatus, OrderWithItems},
    entity::{
        Users,
        cart_items::{Column as CartCol, Entity as CartItems, Model as CartModel},
        menu_items::Entity as MenuItems,
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    money,
    policy::{self, Action, OrderScope, Target},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Exact decimal sum of the cart line prices.
pub fn order_total<I>(line_prices: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    line_prices.into_iter().sum()
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    policy::ensure(user, Action::ListOrders, Target::none())?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = match policy::order_scope(user) {
        OrderScope::All => Condition::all(),
        OrderScope::AssignedTo(crew_id) => Condition::all().add(OrderCol::DeliveryCrewId.eq(crew_id)),
        OrderScope::PlacedBy(user_id) => Condition::all().add(OrderCol::UserId.eq(user_id)),
    };
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Turn the caller's cart into an order. The order, its items and the cart
/// deletion commit together or not at all.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderWithItems>> {
    policy::ensure(user, Action::PlaceOrder, Target::none())?;
    let txn = state.orm.begin().await?;

    let cart = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let total = order_total(cart.iter().map(|entry| entry.price));
    money::ensure_storable(total, "order total")?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        delivery_crew_id: Set(None),
        status: Set(false),
        total: Set(total),
        date: Set(Utc::now().date_naive()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut item_models = Vec::with_capacity(cart.len());
    for entry in &cart {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            menu_item_id: Set(entry.menu_item_id),
            quantity: Set(entry.quantity),
            unit_price: Set(entry.unit_price),
            price: Set(entry.price),
        }
        .insert(&txn)
        .await?;
        item_models.push(item);
    }

    drain_cart(&txn, &cart).await?;

    let items = with_titles(&txn, item_models).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        lines = items.len(),
        total = %order.total,
        "order placed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total.to_string() }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("Your order has been placed. Your id is {}", order.id),
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    policy::ensure(user, Action::ReadOrder, Target::owned_by(order.user_id))?;

    let item_models = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;
    let items = with_titles(&state.orm, item_models).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Flip an order between pending and delivered.
pub async fn toggle_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderStatus>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    policy::ensure(
        user,
        Action::ToggleOrderStatus,
        Target::order(order.user_id, order.delivery_crew_id),
    )?;

    let status = !order.status;
    let mut active: OrderActive = order.into();
    active.status = Set(status);
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, status = order.status, "order status changed");
    audit::record(
        &state.pool,
        user.user_id,
        "order_status_toggle",
        "orders",
        serde_json::json!({ "order_id": order.id, "status": order.status }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("Status of order #{} changed to {}", order.id, order.status),
        OrderStatus {
            id: order.id,
            status: order.status,
        },
        Some(Meta::empty()),
    ))
}

pub async fn assign_delivery_crew(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AssignDeliveryCrewRequest,
) -> AppResult<ApiResponse<Order>> {
    policy::ensure(user, Action::AssignDeliveryCrew, Target::none())?;

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    let crew = Users::find_by_id(payload.delivery_crew)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let mut active: OrderActive = order.into();
    active.delivery_crew_id = Set(Some(crew.id));
    let order = active.update(&state.orm).await?;

    tracing::info!(order_id = %order.id, delivery_crew_id = %crew.id, "delivery crew assigned");
    audit::record(
        &state.pool,
        user.user_id,
        "order_assign_crew",
        "orders",
        serde_json::json!({ "order_id": order.id, "delivery_crew_id": crew.id }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("{} was assigned to order #{}", crew.username, order.id),
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Hard delete; order items go with it through the foreign-key cascade.
pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    policy::ensure(user, Action::DeleteOrder, Target::none())?;

    let result = Orders::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Order"));
    }

    tracing::info!(order_id = %id, "order deleted");
    audit::record(
        &state.pool,
        user.user_id,
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::message(format!("Order #{id} was deleted")))
}

/// Delete exactly `entries`; rows added to the cart since they were read stay.
pub async fn drain_cart<C>(db: &C, entries: &[CartModel]) -> AppResult<u64>
where
    C: ConnectionTrait,
{
    let result = CartItems::delete_many()
        .filter(CartCol::Id.is_in(entries.iter().map(|entry| entry.id)))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn with_titles<C>(db: &C, models: Vec<OrderItemModel>) -> AppResult<Vec<OrderItem>>
where
    C: ConnectionTrait,
{
    let ids: Vec<Uuid> = models.iter().map(|m| m.menu_item_id).collect();
    let menu_items = MenuItems::find()
        .filter(crate::entity::menu_items::Column::Id.is_in(ids))
        .all(db)
        .await?;

    Ok(models
        .into_iter()
        .map(|model| {
            let title = menu_items
                .iter()
                .find(|m| m.id == model.menu_item_id)
                .map(|m| m.title.clone())
                .unwrap_or_default();
            order_item_from_entity(model, title)
        })
        .collect())
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        delivery_crew_id: model.delivery_crew_id,
        status: model.status,
        total: model.total,
        date: model.date,
    }
}

fn order_item_from_entity(model: OrderItemModel, title: String) -> OrderItem {
    OrderItem {
        menu_item_id: model.menu_item_id,
        title,
        quantity: model.quantity,
        unit_price: model.unit_price,
        price: model.price,
    }
}

#[cfg(test)]
mod tests {
    use super::order_total;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn total_is_exact_sum_of_line_prices() {
        assert_eq!(order_total([dec("20.00"), dec("5.00")]), dec("25.00"));
    }

    #[test]
    fn many_small_lines_do_not_drift() {
        let lines = std::iter::repeat_n(dec("0.10"), 1000);
        assert_eq!(order_total(lines), dec("100.00"));
    }

    #[test]
    fn empty_total_is_zero() {
        assert_eq!(order_total(Vec::new()), Decimal::ZERO);
    }
}
