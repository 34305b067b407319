use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::menu::{CreateMenuItemRequest, FeaturedToggled, MenuItemList, UpdateMenuItemRequest},
    entity::{
        categories::{Column as CategoryCol, Entity as Categories, Model as CategoryModel},
        menu_items::{ActiveModel, Column, Entity as MenuItems, Model as MenuItemModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Category, MenuItem},
    money::validate_price,
    policy::{self, Action, Target},
    response::{ApiResponse, Meta},
    routes::params::{MenuItemQuery, MenuItemSortBy, SortOrder, parse_ordering},
    sanitize::{MAX_TEXT_LEN, clean_text},
    state::AppState,
};

pub async fn list_menu_items(
    state: &AppState,
    query: MenuItemQuery,
) -> AppResult<ApiResponse<MenuItemList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(CategoryCol::Title.eq(category.clone()));
    }

    if let Some(title) = query.title.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col((MenuItems, Column::Title)).ilike(format!("%{title}%")));
    }

    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        condition = condition.add(
            Condition::any()
                .add(Expr::col((MenuItems, Column::Title)).ilike(pattern.clone()))
                .add(Expr::col((Categories, CategoryCol::Title)).ilike(pattern)),
        );
    }

    let ordering = match query.ordering.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_ordering(raw).ok_or_else(|| {
            AppError::BadRequest(format!("cannot order by '{raw}'"))
        })?),
        None => None,
    };

    let mut finder = MenuItems::find()
        .find_also_related(Categories)
        .filter(condition);
    finder = match ordering {
        Some((sort_by, order)) => {
            let sort_col = match sort_by {
                MenuItemSortBy::Price => Expr::col((MenuItems, Column::Price)),
                MenuItemSortBy::Title => Expr::col((MenuItems, Column::Title)),
                MenuItemSortBy::Category => Expr::col((Categories, CategoryCol::Title)),
            };
            match order {
                SortOrder::Asc => finder.order_by_asc(sort_col),
                SortOrder::Desc => finder.order_by_desc(sort_col),
            }
        }
        None => finder.order_by_desc(Column::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(item, category)| menu_item_from_entity(item, category))
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Menu items", MenuItemList { items }, Some(meta)))
}

pub async fn get_menu_item(state: &AppState, id: Uuid) -> AppResult<ApiResponse<MenuItem>> {
    let (item, category) = MenuItems::find_by_id(id)
        .find_also_related(Categories)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Menu item"))?;
    Ok(ApiResponse::success(
        "Menu item",
        menu_item_from_entity(item, category)?,
        None,
    ))
}

pub async fn create_menu_item(
    state: &AppState,
    user: &AuthUser,
    payload: CreateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    policy::ensure(user, Action::CreateMenuItem, Target::none())?;
    let title = validate_title(&payload.title)?;
    validate_price(payload.price)?;
    let category = find_category(state, payload.category_id).await?;

    let item = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        price: Set(payload.price),
        featured: Set(payload.featured),
        category_id: Set(category.id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(menu_item_id = %item.id, title = %item.title, "menu item created");
    audit::record(
        &state.pool,
        user.user_id,
        "menu_item_create",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Menu item created",
        menu_item_from_entity(item, Some(category))?,
        Some(Meta::empty()),
    ))
}

pub async fn update_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateMenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    policy::ensure(user, Action::UpdateMenuItem, Target::none())?;
    let existing = MenuItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Menu item"))?;

    let category_id = payload.category_id.unwrap_or(existing.category_id);
    let category = find_category(state, category_id).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(validate_title(&title)?);
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(featured) = payload.featured {
        active.featured = Set(featured);
    }
    active.category_id = Set(category.id);

    let item = active.update(&state.orm).await?;

    tracing::info!(menu_item_id = %item.id, "menu item updated");
    audit::record(
        &state.pool,
        user.user_id,
        "menu_item_update",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        menu_item_from_entity(item, Some(category))?,
        Some(Meta::empty()),
    ))
}

pub async fn toggle_featured(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<FeaturedToggled>> {
    policy::ensure(user, Action::ToggleFeatured, Target::none())?;
    let existing = MenuItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Menu item"))?;

    let featured = !existing.featured;
    let mut active: ActiveModel = existing.into();
    active.featured = Set(featured);
    let item = active.update(&state.orm).await?;

    tracing::info!(menu_item_id = %item.id, featured = item.featured, "menu item featured toggled");
    audit::record(
        &state.pool,
        user.user_id,
        "menu_item_feature",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id, "featured": item.featured }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("{} changed to {}", item.title, item.featured),
        FeaturedToggled {
            id: item.id,
            featured: item.featured,
        },
        Some(Meta::empty()),
    ))
}

pub async fn delete_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    policy::ensure(user, Action::DeleteMenuItem, Target::none())?;
    let result = MenuItems::delete_by_id(id)
        .exec(&state.orm)
        .await
        .map_err(referenced_by_orders)?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Menu item"));
    }

    tracing::info!(menu_item_id = %id, "menu item deleted");
    audit::record(
        &state.pool,
        user.user_id,
        "menu_item_delete",
        "menu_items",
        serde_json::json!({ "menu_item_id": id }),
    )
    .await;

    Ok(ApiResponse::message("Deleted"))
}

fn referenced_by_orders(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            AppError::Conflict("Menu item is referenced by existing orders".into())
        }
        _ => AppError::OrmError(err),
    }
}

async fn find_category(state: &AppState, id: Uuid) -> AppResult<CategoryModel> {
    Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Category"))
}

pub(crate) fn validate_title(raw: &str) -> AppResult<String> {
    let title = clean_text(raw);
    if title.is_empty() {
        return Err(AppError::BadRequest("title must not be blank".into()));
    }
    if title.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::BadRequest(format!(
            "title must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(title)
}

pub(crate) fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        slug: model.slug,
        title: model.title,
    }
}

fn menu_item_from_entity(
    model: MenuItemModel,
    category: Option<CategoryModel>,
) -> AppResult<MenuItem> {
    let category = category.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("menu item {} has no category", model.id))
    })?;
    Ok(MenuItem {
        id: model.id,
        title: model.title,
        price: model.price,
        featured: model.featured,
        category: category_from_entity(category),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_sanitized_and_required() {
        assert_eq!(validate_title(" <b>Bruschetta</b> ").unwrap(), "&lt;b&gt;Bruschetta&lt;/b&gt;");
        assert!(matches!(validate_title("   "), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn title_length_is_measured_after_escaping() {
        assert!(validate_title(&"a".repeat(MAX_TEXT_LEN)).is_ok());
        // 50 quotes escape to 300 characters.
        assert!(matches!(
            validate_title(&"'".repeat(50)),
            Err(AppError::BadRequest(_))
        ));
    }
}
