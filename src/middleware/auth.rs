use std::collections::HashSet;

use axum::{extract::FromRequestParts, http::header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect, RelationTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entity::{
        Groups, Users,
        groups::{self, Column as GroupCol},
        user_groups::Column as UserGroupCol,
    },
    error::{AppError, AppResult},
    policy::{Denied, Role},
    state::AppState,
};

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

impl Claims {
    pub fn new(user_id: Uuid, ttl: Duration) -> Self {
        let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
        Self {
            sub: user_id.to_string(),
            exp,
        }
    }

    pub fn sign(&self, secret: &str) -> AppResult<String> {
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }
}

/// The authenticated caller with roles resolved for this request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub roles: HashSet<Role>,
}

impl AuthUser {
    pub fn new(user_id: Uuid, username: impl Into<String>, roles: &[Role]) -> Self {
        let mut set: HashSet<Role> = roles.iter().copied().collect();
        set.insert(Role::Customer);
        Self {
            user_id,
            username: username.into(),
            roles: set,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

pub fn role_for_group(name: &str) -> Option<Role> {
    match name {
        groups::MANAGER => Some(Role::Manager),
        groups::DELIVERY_CREW => Some(Role::DeliveryCrew),
        _ => None,
    }
}

/// Load a user and derive its roles from the staff flag and group memberships.
pub async fn load_auth_user(state: &AppState, user_id: Uuid) -> AppResult<Option<AuthUser>> {
    let Some(user) = Users::find_by_id(user_id).one(&state.orm).await? else {
        return Ok(None);
    };

    let group_names: Vec<String> = Groups::find()
        .join(
            sea_orm::JoinType::InnerJoin,
            groups::Relation::UserGroups.def(),
        )
        .filter(UserGroupCol::UserId.eq(user.id))
        .select_only()
        .column(GroupCol::Name)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let mut roles: Vec<Role> = group_names
        .iter()
        .filter_map(|name| role_for_group(name))
        .collect();
    if user.is_staff {
        roles.push(Role::Admin);
    }

    Ok(Some(AuthUser::new(user.id, user.username, &roles)))
}

fn bearer_token(parts: &axum::http::request::Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(Denied::Unauthenticated)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("invalid Authorization header".into()))?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("invalid Authorization scheme".into()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized("invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::Unauthorized("invalid user id in token".into()))?;

        let user = load_auth_user(state, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown user".into()))?;

        tracing::debug!(user_id = %user.user_id, roles = ?user.roles, "caller resolved");
        Ok(user)
    }
}
