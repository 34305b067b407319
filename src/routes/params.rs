use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItemSortBy {
    Price,
    Title,
    Category,
}

/// Parse an `ordering` value such as `price` or `-title`.
pub fn parse_ordering(raw: &str) -> Option<(MenuItemSortBy, SortOrder)> {
    let (field, order) = match raw.strip_prefix('-') {
        Some(rest) => (rest, SortOrder::Desc),
        None => (raw, SortOrder::Asc),
    };
    let sort_by = match field {
        "price" => MenuItemSortBy::Price,
        "title" => MenuItemSortBy::Title,
        "category" => MenuItemSortBy::Category,
        _ => return None,
    };
    Some((sort_by, order))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct MenuItemQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Only items priced at or below this value.
    pub max_price: Option<rust_decimal::Decimal>,
    /// Exact category title.
    pub category: Option<String>,
    /// Case-insensitive substring of the item title.
    pub title: Option<String>,
    /// Case-insensitive substring of the item or category title.
    pub search: Option<String>,
    /// One of `price`, `title`, `category`, optionally prefixed with `-`.
    pub ordering: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// `false` for pending, `true` for delivered.
    pub status: Option<bool>,
    pub sort_order: Option<SortOrder>,
}

// Paging fields stay inline: `#[serde(flatten)]` breaks numeric query values.
impl MenuItemQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RemoveFromCartQuery {
    /// Remove only this menu item; omit to clear the whole cart.
    pub menuitem: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default().normalize(), (1, 20, 0));
        let p = Pagination {
            page: Some(0),
            per_page: Some(1000),
        };
        assert_eq!(p.normalize(), (1, 100, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(10),
        };
        assert_eq!(p.normalize(), (3, 10, 20));
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(20),
        };
        assert_eq!(p.normalize(), (i64::MAX, 20, i64::MAX));
    }

    #[test]
    fn ordering_accepts_known_fields_with_direction() {
        assert_eq!(
            parse_ordering("price"),
            Some((MenuItemSortBy::Price, SortOrder::Asc))
        );
        assert_eq!(
            parse_ordering("-category"),
            Some((MenuItemSortBy::Category, SortOrder::Desc))
        );
        assert_eq!(parse_ordering("inventory"), None);
        assert_eq!(parse_ordering("-"), None);
    }
}
