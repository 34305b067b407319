use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartCleared, CartList},
        categories::{CategoryList, CreateCategoryRequest},
        groups::{GroupMembershipRequest, UserList},
        menu::{CreateMenuItemRequest, FeaturedToggled, MenuItemList, UpdateMenuItemRequest},
        orders::{AssignDeliveryCrewRequest, OrderList, OrderStatus, OrderWithItems},
    },
    models::{CartItem, CartMenuItem, Category, MenuItem, Order, OrderItem, User},
    response::{ApiResponse, Meta},
    routes::{cart, categories, groups, health, menu_items, orders, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        menu_items::list_menu_items,
        menu_items::get_menu_item,
        menu_items::create_menu_item,
        menu_items::update_menu_item,
        menu_items::toggle_featured,
        menu_items::delete_menu_item,
        categories::list_categories,
        categories::create_category,
        groups::list_managers,
        groups::add_manager,
        groups::remove_manager,
        groups::list_delivery_crew,
        groups::add_delivery_crew,
        groups::remove_delivery_crew,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart,
        orders::list_orders,
        orders::place_order,
        orders::get_order,
        orders::toggle_status,
        orders::assign_delivery_crew,
        orders::delete_order
    ),
    components(
        schemas(
            User,
            Category,
            MenuItem,
            CartMenuItem,
            CartItem,
            Order,
            OrderItem,
            AddToCartRequest,
            CartCleared,
            CartList,
            CreateCategoryRequest,
            CategoryList,
            GroupMembershipRequest,
            UserList,
            CreateMenuItemRequest,
            UpdateMenuItemRequest,
            MenuItemList,
            FeaturedToggled,
            AssignDeliveryCrewRequest,
            OrderList,
            OrderStatus,
            OrderWithItems,
            params::Pagination,
            params::SortOrder,
            params::OrderListQuery,
            health::HealthData,
            Meta,
            ApiResponse<MenuItem>,
            ApiResponse<MenuItemList>,
            ApiResponse<CartList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Menu", description = "Menu item endpoints"),
        (name = "Categories", description = "Menu category endpoints"),
        (name = "Groups", description = "Manager and delivery crew membership"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
