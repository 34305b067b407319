use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::categories::{CategoryList, CreateCategoryRequest},
    entity::categories::{ActiveModel, Column, Entity as Categories},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Category,
    policy::{self, Action, Target},
    response::{ApiResponse, Meta},
    sanitize::{MAX_TEXT_LEN, clean_text},
    services::menu_service::category_from_entity,
    state::AppState,
};

pub async fn list_categories(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CategoryList>> {
    policy::ensure(user, Action::ListCategories, Target::none())?;
    let items: Vec<Category> = Categories::find()
        .order_by_asc(Column::Title)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect();

    let meta = Meta::unpaged(items.len());
    Ok(ApiResponse::success("Categories", CategoryList { items }, Some(meta)))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    policy::ensure(user, Action::CreateCategory, Target::none())?;
    let slug = normalize_slug(&payload.slug)?;
    let title = clean_text(&payload.title);
    if title.is_empty() {
        return Err(AppError::BadRequest("title must not be blank".into()));
    }
    if title.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::BadRequest(format!(
            "title must be at most {MAX_TEXT_LEN} characters"
        )));
    }

    let category = ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(slug),
        title: Set(title),
    }
    .insert(&state.orm)
    .await
    .map_err(|err| AppError::conflict_on_unique(err, "Category already exists"))?;

    tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
    audit::record(
        &state.pool,
        user.user_id,
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

/// Slugs are lowercase ASCII letters, digits, `-` and `_`.
fn normalize_slug(raw: &str) -> AppResult<String> {
    let slug = raw.trim().to_ascii_lowercase();
    if slug.is_empty() {
        return Err(AppError::BadRequest("slug must not be blank".into()));
    }
    if slug.len() > MAX_TEXT_LEN {
        return Err(AppError::BadRequest(format!(
            "slug must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::BadRequest(format!("invalid slug '{slug}'")));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::normalize_slug;

    #[test]
    fn slug_is_lowercased_and_validated() {
        assert_eq!(normalize_slug(" Main-Course ").unwrap(), "main-course");
        assert!(normalize_slug("").is_err());
        assert!(normalize_slug("main course").is_err());
        assert!(normalize_slug(&"a".repeat(256)).is_err());
    }
}
