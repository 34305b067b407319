use sea_orm::{
    ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};

use crate::{
    audit,
    dto::groups::{GroupMembershipRequest, UserList},
    entity::{
        groups::{self, Column as GroupCol, Entity as Groups, Model as GroupModel},
        user_groups::{ActiveModel as MembershipActive, Column as MembershipCol, Entity as UserGroups},
        users::{self, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    policy::{self, Action, Target},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// A staff group whose membership grants a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffGroup {
    Manager,
    DeliveryCrew,
}

impl StaffGroup {
    pub fn name(self) -> &'static str {
        match self {
            StaffGroup::Manager => groups::MANAGER,
            StaffGroup::DeliveryCrew => groups::DELIVERY_CREW,
        }
    }

    fn action(self) -> Action {
        match self {
            StaffGroup::Manager => Action::ManageManagers,
            StaffGroup::DeliveryCrew => Action::ManageDeliveryCrew,
        }
    }

    fn label(self) -> &'static str {
        match self {
            StaffGroup::Manager => "manager group",
            StaffGroup::DeliveryCrew => "delivery crew",
        }
    }
}

pub async fn list_members(
    state: &AppState,
    user: &AuthUser,
    group: StaffGroup,
) -> AppResult<ApiResponse<UserList>> {
    policy::ensure(user, group.action(), Target::none())?;
    let group_row = find_group(state, group).await?;

    let items: Vec<User> = Users::find()
        .join(
            sea_orm::JoinType::InnerJoin,
            users::Relation::UserGroups.def(),
        )
        .filter(MembershipCol::GroupId.eq(group_row.id))
        .order_by_asc(UserCol::Username)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(user_from_entity)
        .collect();

    let meta = Meta::unpaged(items.len());
    Ok(ApiResponse::success("OK", UserList { items }, Some(meta)))
}

pub async fn add_member(
    state: &AppState,
    user: &AuthUser,
    group: StaffGroup,
    payload: GroupMembershipRequest,
) -> AppResult<ApiResponse<User>> {
    policy::ensure(user, group.action(), Target::none())?;
    let username = required_username(payload)?;
    let member = find_user(state, &username).await?;
    let group_row = find_group(state, group).await?;

    let membership = MembershipActive {
        user_id: Set(member.id),
        group_id: Set(group_row.id),
    };
    UserGroups::insert(membership)
        .on_conflict(
            sea_orm::sea_query::OnConflict::columns([MembershipCol::UserId, MembershipCol::GroupId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&state.orm)
        .await?;

    tracing::info!(user_id = %member.id, group = group.name(), "group member added");
    audit::record(
        &state.pool,
        user.user_id,
        "group_add",
        "user_groups",
        serde_json::json!({ "user_id": member.id, "group": group.name() }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("User added to {}.", group.label()),
        user_from_entity(member),
        Some(Meta::empty()),
    ))
}

pub async fn remove_member(
    state: &AppState,
    user: &AuthUser,
    group: StaffGroup,
    payload: GroupMembershipRequest,
) -> AppResult<ApiResponse<User>> {
    policy::ensure(user, group.action(), Target::none())?;
    let username = required_username(payload)?;
    let member = find_user(state, &username).await?;
    let group_row = find_group(state, group).await?;

    UserGroups::delete_many()
        .filter(MembershipCol::UserId.eq(member.id))
        .filter(MembershipCol::GroupId.eq(group_row.id))
        .exec(&state.orm)
        .await?;

    tracing::info!(user_id = %member.id, group = group.name(), "group member removed");
    audit::record(
        &state.pool,
        user.user_id,
        "group_remove",
        "user_groups",
        serde_json::json!({ "user_id": member.id, "group": group.name() }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("User removed from {}.", group.label()),
        user_from_entity(member),
        Some(Meta::empty()),
    ))
}

fn required_username(payload: GroupMembershipRequest) -> AppResult<String> {
    payload
        .username
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::BadRequest("username is required".into()))
}

async fn find_user(state: &AppState, username: &str) -> AppResult<UserModel> {
    Users::find()
        .filter(UserCol::Username.eq(username))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("User"))
}

async fn find_group(state: &AppState, group: StaffGroup) -> AppResult<GroupModel> {
    Groups::find()
        .filter(GroupCol::Name.eq(group.name()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Group"))
}

fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_required_and_trimmed() {
        let ok = required_username(GroupMembershipRequest {
            username: Some("  alice ".into()),
        });
        assert_eq!(ok.unwrap(), "alice");

        for missing in [None, Some(String::new()), Some("   ".into())] {
            let err = required_username(GroupMembershipRequest { username: missing });
            assert!(matches!(err, Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn staff_groups_map_to_seeded_names() {
        assert_eq!(StaffGroup::Manager.name(), "Manager");
        assert_eq!(StaffGroup::DeliveryCrew.name(), "Delivery crew");
    }
}
