use little_lemon_api::{
    db::{create_pool, run_migrations},
    dto::{
        cart::AddToCartRequest, groups::GroupMembershipRequest, menu::CreateMenuItemRequest,
        orders::AssignDeliveryCrewRequest,
    },
    entity::{
        CartItems, OrderItems, Orders,
        cart_items::Column as CartCol,
        categories::ActiveModel as CategoryActive,
        menu_items::ActiveModel as MenuItemActive,
        order_items::Column as OrderItemCol,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::{AuthUser, load_auth_user},
    policy::{self, Action, Role, Target},
    routes::params::{MenuItemQuery, OrderListQuery},
    services::{
        cart_service, group_service::{self, StaffGroup}, menu_service, order_service,
    },
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use std::str::FromStr;
use uuid::Uuid;

// Each test creates its own users and menu items, so they can share one database.
async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url, 5).await?;
    run_migrations(&pool).await?;
    Ok(Some(AppState::new(pool, "test-secret")))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

async fn create_user(state: &AppState, prefix: &str, is_staff: bool) -> anyhow::Result<AuthUser> {
    let username = unique(prefix);
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.clone()),
        email: Set(format!("{username}@littlelemon.test")),
        is_staff: Set(is_staff),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let roles = if is_staff { vec![Role::Admin] } else { vec![] };
    Ok(AuthUser::new(user.id, user.username, &roles))
}

async fn create_category(state: &AppState) -> anyhow::Result<Uuid> {
    let slug = unique("flow");
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        slug: Set(slug.clone()),
        title: Set(slug),
    }
    .insert(&state.orm)
    .await?;
    Ok(category.id)
}

async fn create_menu_item(state: &AppState, title: &str, price: Decimal) -> anyhow::Result<Uuid> {
    let category_id = create_category(state).await?;

    let item = MenuItemActive {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        price: Set(price),
        featured: Set(false),
        category_id: Set(category_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(item.id)
}

async fn add(
    state: &AppState,
    user: &AuthUser,
    menuitem: Uuid,
    quantity: i32,
) -> Result<(), AppError> {
    cart_service::add_to_cart(state, user, AddToCartRequest { menuitem, quantity }).await?;
    Ok(())
}

async fn cart_len(state: &AppState, user: &AuthUser) -> anyhow::Result<usize> {
    let cart = cart_service::list_cart(state, user).await?;
    Ok(cart.data.map(|c| c.items.len()).unwrap_or_default())
}

// Cart of A (10.00 x 2) and B (5.00 x 1) becomes one order totalling 25.00.
#[tokio::test]
async fn placing_an_order_drains_the_cart_into_order_items() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, "customer", false).await?;
    let item_a = create_menu_item(&state, "Greek Salad", Decimal::new(1000, 2)).await?;
    let item_b = create_menu_item(&state, "Bruschetta", Decimal::new(500, 2)).await?;

    add(&state, &customer, item_a, 2).await?;
    add(&state, &customer, item_b, 1).await?;

    let duplicate = add(&state, &customer, item_a, 5).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let cart = cart_service::list_cart(&state, &customer)
        .await?
        .data
        .expect("cart data");
    let line_a = cart
        .items
        .iter()
        .find(|line| line.menuitem.id == item_a)
        .expect("line for A");
    assert_eq!(line_a.quantity, 2, "duplicate add left the first entry alone");
    assert_eq!(line_a.price, Decimal::new(2000, 2));

    let placed = order_service::place_order(&state, &customer)
        .await?
        .data
        .expect("order data");
    assert_eq!(placed.order.total, Decimal::new(2500, 2));
    assert_eq!(placed.order.user_id, customer.user_id);
    assert!(!placed.order.status);
    assert_eq!(placed.order.delivery_crew_id, None);
    assert_eq!(placed.items.len(), 2);
    let line_total: Decimal = placed.items.iter().map(|item| item.price).sum();
    assert_eq!(line_total, placed.order.total);
    assert!(placed.items.iter().any(|item| item.title == "Greek Salad"));

    assert_eq!(cart_len(&state, &customer).await?, 0);

    let fetched = order_service::get_order(&state, &customer, placed.order.id)
        .await?
        .data
        .expect("order data");
    assert_eq!(fetched.items.len(), 2);

    let listed = order_service::list_orders(&state, &customer, OrderListQuery::default())
        .await?
        .data
        .expect("order list");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].id, placed.order.id);

    Ok(())
}

#[tokio::test]
async fn empty_cart_cannot_be_ordered() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, "empty", false).await?;

    let result = order_service::place_order(&state, &customer).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let listed = order_service::list_orders(&state, &customer, OrderListQuery::default())
        .await?
        .data
        .expect("order list");
    assert!(listed.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn cart_add_validates_and_remove_is_scoped() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, "cart", false).await?;
    let item_a = create_menu_item(&state, "Lemon Dessert", Decimal::new(650, 2)).await?;
    let item_b = create_menu_item(&state, "Grilled Fish", Decimal::new(1800, 2)).await?;

    assert!(matches!(
        add(&state, &customer, item_a, 0).await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        add(&state, &customer, Uuid::new_v4(), 1).await,
        Err(AppError::NotFound(_))
    ));

    add(&state, &customer, item_a, 1).await?;
    add(&state, &customer, item_b, 3).await?;

    let removed = cart_service::remove_from_cart(&state, &customer, Some(item_a))
        .await?
        .data
        .expect("removed");
    assert_eq!(removed.removed, 1);
    assert_eq!(cart_len(&state, &customer).await?, 1);

    assert!(matches!(
        cart_service::remove_from_cart(&state, &customer, Some(item_a)).await,
        Err(AppError::NotFound(_))
    ));

    let cleared = cart_service::remove_from_cart(&state, &customer, None)
        .await?
        .data
        .expect("removed");
    assert_eq!(cleared.removed, 1);
    assert_eq!(cart_len(&state, &customer).await?, 0);

    // Clearing an empty cart still succeeds.
    let cleared = cart_service::remove_from_cart(&state, &customer, None)
        .await?
        .data
        .expect("removed");
    assert_eq!(cleared.removed, 0);
    Ok(())
}

#[tokio::test]
async fn staff_manage_orders_within_their_roles() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, "diner", false).await?;
    let other = create_user(&state, "other", false).await?;
    let admin = create_user(&state, "admin", true).await?;
    let crew_account = create_user(&state, "crew", false).await?;
    let item = create_menu_item(&state, "Pasta", Decimal::new(1250, 2)).await?;

    group_service::add_member(
        &state,
        &admin,
        StaffGroup::DeliveryCrew,
        GroupMembershipRequest {
            username: Some(crew_account.username.clone()),
        },
    )
    .await?;
    let crew = load_auth_user(&state, crew_account.user_id)
        .await?
        .expect("crew user");
    assert!(crew.has_role(Role::DeliveryCrew));

    add(&state, &customer, item, 2).await?;
    let order_id = order_service::place_order(&state, &customer)
        .await?
        .data
        .expect("order")
        .order
        .id;

    // Another customer sees neither the order nor its status.
    assert!(matches!(
        order_service::get_order(&state, &other, order_id).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        order_service::toggle_status(&state, &other, order_id).await,
        Err(AppError::Forbidden)
    ));

    // Crew cannot touch an order until it is assigned to them.
    assert!(matches!(
        order_service::toggle_status(&state, &crew, order_id).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        order_service::assign_delivery_crew(
            &state,
            &crew,
            order_id,
            AssignDeliveryCrewRequest {
                delivery_crew: crew.user_id
            }
        )
        .await,
        Err(AppError::Forbidden)
    ));

    assert!(matches!(
        order_service::assign_delivery_crew(
            &state,
            &admin,
            order_id,
            AssignDeliveryCrewRequest {
                delivery_crew: Uuid::new_v4()
            }
        )
        .await,
        Err(AppError::NotFound(_))
    ));
    let assigned = order_service::assign_delivery_crew(
        &state,
        &admin,
        order_id,
        AssignDeliveryCrewRequest {
            delivery_crew: crew.user_id,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(assigned.delivery_crew_id, Some(crew.user_id));

    let crew_orders = order_service::list_orders(&state, &crew, OrderListQuery::default())
        .await?
        .data
        .expect("order list");
    assert_eq!(crew_orders.items.len(), 1);
    assert_eq!(crew_orders.items[0].id, order_id);

    let first = order_service::toggle_status(&state, &crew, order_id)
        .await?
        .data
        .expect("status");
    assert!(first.status);
    let second = order_service::toggle_status(&state, &crew, order_id)
        .await?
        .data
        .expect("status");
    assert!(!second.status, "toggling twice restores the status");

    assert!(matches!(
        order_service::delete_order(&state, &crew, order_id).await,
        Err(AppError::Forbidden)
    ));
    order_service::delete_order(&state, &admin, order_id).await?;

    assert!(Orders::find_by_id(order_id).one(&state.orm).await?.is_none());
    let orphan_items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .count(&state.orm)
        .await?;
    assert_eq!(orphan_items, 0);

    assert!(matches!(
        order_service::delete_order(&state, &admin, order_id).await,
        Err(AppError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn manager_membership_grants_and_revokes_the_role() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, "owner", true).await?;
    let alice = create_user(&state, "alice", false).await?;

    let before = load_auth_user(&state, alice.user_id).await?.expect("alice");
    assert!(policy::ensure(&before, Action::CreateMenuItem, Target::none()).is_err());

    assert!(matches!(
        group_service::add_member(
            &state,
            &before,
            StaffGroup::Manager,
            GroupMembershipRequest {
                username: Some(alice.username.clone()),
            },
        )
        .await,
        Err(AppError::Forbidden)
    ));

    let request = || GroupMembershipRequest {
        username: Some(alice.username.clone()),
    };
    group_service::add_member(&state, &admin, StaffGroup::Manager, request()).await?;
    // Adding again is a no-op.
    group_service::add_member(&state, &admin, StaffGroup::Manager, request()).await?;

    let promoted = load_auth_user(&state, alice.user_id).await?.expect("alice");
    assert!(promoted.has_role(Role::Manager));
    assert!(policy::ensure(&promoted, Action::CreateMenuItem, Target::none()).is_ok());

    let members = group_service::list_members(&state, &promoted, StaffGroup::Manager)
        .await?
        .data
        .expect("members");
    assert!(members.items.iter().any(|member| member.id == alice.user_id));

    group_service::remove_member(&state, &admin, StaffGroup::Manager, request()).await?;
    let demoted = load_auth_user(&state, alice.user_id).await?.expect("alice");
    assert!(!demoted.has_role(Role::Manager));
    assert!(policy::ensure(&demoted, Action::CreateMenuItem, Target::none()).is_err());

    assert!(matches!(
        group_service::add_member(
            &state,
            &admin,
            StaffGroup::Manager,
            GroupMembershipRequest { username: None },
        )
        .await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        group_service::add_member(
            &state,
            &admin,
            StaffGroup::Manager,
            GroupMembershipRequest {
                username: Some(unique("ghost")),
            },
        )
        .await,
        Err(AppError::NotFound(_))
    ));
    Ok(())
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("decimal")
}

#[tokio::test]
async fn amounts_outside_the_money_columns_are_bad_requests() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, "bounds-admin", true).await?;
    let customer = create_user(&state, "bounds", false).await?;
    let category_id = create_category(&state).await?;

    for price in ["0.001", "100000000.00"] {
        let result = menu_service::create_menu_item(
            &state,
            &admin,
            CreateMenuItemRequest {
                title: "Saffron Risotto".into(),
                price: dec(price),
                category_id,
                featured: false,
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))), "price {price}");
    }

    let long_title = menu_service::create_menu_item(
        &state,
        &admin,
        CreateMenuItemRequest {
            title: "'".repeat(60),
            price: dec("9.50"),
            category_id,
            featured: false,
        },
    )
    .await;
    assert!(matches!(long_title, Err(AppError::BadRequest(_))));

    let item = create_menu_item(&state, "Catering Platter", dec("1000.00")).await?;
    assert!(matches!(
        add(&state, &customer, item, 200_000).await,
        Err(AppError::BadRequest(_))
    ));
    assert_eq!(cart_len(&state, &customer).await?, 0);
    Ok(())
}

#[tokio::test]
async fn order_total_beyond_the_column_range_is_rejected() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, "whale", false).await?;
    let item_a = create_menu_item(&state, "Banquet A", dec("60000000.00")).await?;
    let item_b = create_menu_item(&state, "Banquet B", dec("60000000.00")).await?;
    add(&state, &customer, item_a, 1).await?;
    add(&state, &customer, item_b, 1).await?;

    let result = order_service::place_order(&state, &customer).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    // Nothing was written and the cart can still be edited.
    assert_eq!(cart_len(&state, &customer).await?, 2);
    let listed = order_service::list_orders(&state, &customer, OrderListQuery::default())
        .await?
        .data
        .expect("order list");
    assert!(listed.items.is_empty());

    cart_service::remove_from_cart(&state, &customer, Some(item_b)).await?;
    let placed = order_service::place_order(&state, &customer)
        .await?
        .data
        .expect("order");
    assert_eq!(placed.order.total, dec("60000000.00"));
    Ok(())
}

#[tokio::test]
async fn draining_keeps_entries_added_after_the_cart_was_read() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, "racer", false).await?;
    let item_a = create_menu_item(&state, "Lemon Tart", dec("4.00")).await?;
    let item_b = create_menu_item(&state, "Iced Tea", dec("2.50")).await?;
    add(&state, &customer, item_a, 1).await?;

    let txn = state.orm.begin().await?;
    let locked = CartItems::find()
        .filter(CartCol::UserId.eq(customer.user_id))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    assert_eq!(locked.len(), 1);

    // Committed on another connection while the first transaction is open.
    add(&state, &customer, item_b, 1).await?;

    let drained = order_service::drain_cart(&txn, &locked).await?;
    txn.commit().await?;
    assert_eq!(drained, 1);

    let cart = cart_service::list_cart(&state, &customer)
        .await?
        .data
        .expect("cart data");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].menuitem.id, item_b);
    Ok(())
}

#[tokio::test]
async fn pages_past_the_end_are_empty() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, "pager", false).await?;

    let menu = menu_service::list_menu_items(
        &state,
        MenuItemQuery {
            page: Some(i64::MAX),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("menu");
    assert!(menu.items.is_empty());

    let orders = order_service::list_orders(
        &state,
        &customer,
        OrderListQuery {
            page: Some(i64::MAX),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("orders");
    assert!(orders.items.is_empty());
    Ok(())
}
