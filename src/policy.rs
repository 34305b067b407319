//! Role-based access rules.
//!
//! Every endpoint maps to an [`Action`]; [`authorize`] decides whether a caller
//! may perform it against a [`Target`]. The function is pure: roles are loaded
//! per request by the auth extractor and passed in.

use uuid::Uuid;

use crate::{error::AppError, middleware::auth::AuthUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Customer,
    Manager,
    DeliveryCrew,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListMenuItems,
    ReadMenuItem,
    CreateMenuItem,
    UpdateMenuItem,
    DeleteMenuItem,
    ToggleFeatured,
    ListCategories,
    CreateCategory,
    ManageManagers,
    ManageDeliveryCrew,
    ReadCart,
    AddToCart,
    RemoveFromCart,
    ListOrders,
    PlaceOrder,
    ReadOrder,
    ToggleOrderStatus,
    AssignDeliveryCrew,
    DeleteOrder,
}

/// Who owns, or is assigned to, the resource being acted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Target {
    pub owner: Option<Uuid>,
    pub assignee: Option<Uuid>,
}

impl Target {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn owned_by(owner: Uuid) -> Self {
        Self {
            owner: Some(owner),
            assignee: None,
        }
    }

    pub fn order(owner: Uuid, assignee: Option<Uuid>) -> Self {
        Self {
            owner: Some(owner),
            assignee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    Unauthenticated,
    Forbidden,
}

impl From<Denied> for AppError {
    fn from(denied: Denied) -> Self {
        match denied {
            Denied::Unauthenticated => {
                AppError::Unauthorized("credentials were not provided".into())
            }
            Denied::Forbidden => AppError::Forbidden,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Public,
    Authenticated,
    Owner,
    AnyOf(&'static [Role]),
    AnyOfOrAssignee(&'static [Role]),
}

const STAFF: &[Role] = &[Role::Manager, Role::Admin];
const ADMIN: &[Role] = &[Role::Admin];

fn rule_for(action: Action) -> Rule {
    use Action::*;
    match action {
        ListMenuItems | ReadMenuItem => Rule::Public,
        CreateMenuItem | UpdateMenuItem | DeleteMenuItem | ToggleFeatured => Rule::AnyOf(STAFF),
        ListCategories | CreateCategory => Rule::AnyOf(ADMIN),
        ManageManagers | ManageDeliveryCrew => Rule::AnyOf(STAFF),
        ReadCart | AddToCart | RemoveFromCart => Rule::Owner,
        ListOrders | PlaceOrder => Rule::Authenticated,
        ReadOrder => Rule::Owner,
        ToggleOrderStatus => Rule::AnyOfOrAssignee(STAFF),
        AssignDeliveryCrew | DeleteOrder => Rule::AnyOf(STAFF),
    }
}

pub fn authorize(caller: Option<&AuthUser>, action: Action, target: Target) -> Result<(), Denied> {
    let rule = rule_for(action);
    if let Rule::Public = rule {
        return Ok(());
    }
    let Some(caller) = caller else {
        return Err(Denied::Unauthenticated);
    };

    let allowed = match rule {
        Rule::Public | Rule::Authenticated => true,
        Rule::Owner => target.owner == Some(caller.user_id),
        Rule::AnyOf(roles) => roles.iter().any(|role| caller.has_role(*role)),
        Rule::AnyOfOrAssignee(roles) => {
            roles.iter().any(|role| caller.has_role(*role))
                || (caller.has_role(Role::DeliveryCrew)
                    && target.assignee == Some(caller.user_id))
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(Denied::Forbidden)
    }
}

/// Shorthand for services: deny with the matching `AppError`.
pub fn ensure(caller: &AuthUser, action: Action, target: Target) -> Result<(), AppError> {
    authorize(Some(caller), action, target).map_err(AppError::from)
}

/// Which orders a caller sees when listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    AssignedTo(Uuid),
    PlacedBy(Uuid),
}

pub fn order_scope(caller: &AuthUser) -> OrderScope {
    if caller.has_role(Role::Admin) || caller.has_role(Role::Manager) {
        OrderScope::All
    } else if caller.has_role(Role::DeliveryCrew) {
        OrderScope::AssignedTo(caller.user_id)
    } else {
        OrderScope::PlacedBy(caller.user_id)
    }
}
