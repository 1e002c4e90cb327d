use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use courier_db::models::UserRow;
use courier_types::api::{UserListQuery, UserResponse, UsersResponse};
use courier_types::models::UserSummary;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::validate::Validator;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

pub async fn get_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    let page = paging(&mut v, &query);
    let (offset, limit) = v.finish(page)?;

    let rows = state.db(move |db| db.list_users(offset, limit)).await?;
    Ok(Json(UsersResponse { users: summaries(&rows)? }))
}

/// GET /users/search?query=: case-insensitive match on name or email.
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    let needle = v.text(query.query.as_deref(), "query", "Query string is invalid");
    let page = paging(&mut v, &query);
    let (needle, (offset, limit)) = v.finish(needle.zip(page))?;

    let needle = needle.to_string();
    let rows = state.db(move |db| db.search_users(&needle, offset, limit)).await?;
    Ok(Json(UsersResponse { users: summaries(&rows)? }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    let id = v.id(Some(&user_id), "userId", "Invalid user ID");
    let id = v.finish(id)?.to_string();

    let row = state
        .db(move |db| db.get_user_by_id(&id))
        .await?
        .ok_or_else(|| ApiError::validation("No user found"))?;

    Ok(Json(UserResponse { user: row.summary()? }))
}

/// `(offset, limit)` from the optional page/limit parameters. Values below
/// one fall back to the defaults.
fn paging(v: &mut Validator, query: &UserListQuery) -> Option<(u32, u32)> {
    let page = v.optional_int(query.page.as_deref(), "page", "Page must be an integer");
    let limit = v.optional_int(query.limit.as_deref(), "limit", "Limit must be an integer");
    let (page, limit) = page.zip(limit)?;

    let page = page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE);
    let limit = limit.filter(|l| *l >= 1).unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = (page - 1).saturating_mul(limit).min(u32::MAX as i64);
    Some((offset as u32, limit as u32))
}

fn summaries(rows: &[UserRow]) -> anyhow::Result<Vec<UserSummary>> {
    rows.iter().map(UserRow::summary).collect()
}
