use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use courier_db::queries::UserChanges;
use courier_types::api::{DataEnvelope, DeletedResponse, EditProfileRequest, ProfileResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::validate::{Validator, looks_like_email};

const NO_DATA: &str = "No user data submitted";

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user.id.to_string();
    let (row, friends) = state
        .db(move |db| {
            let row = db.get_user_by_id(&uid)?;
            let friends = db.get_contact_ids(&uid)?;
            Ok((row, friends))
        })
        .await?;
    let row = row.ok_or_else(|| ApiError::not_found("No user found"))?;

    Ok(Json(ProfileResponse {
        user: row.profile(&friends)?,
    }))
}

/// PUT /profile: partial update. Blank fields are left unchanged; the
/// request fails only when it carries nothing usable or a malformed email.
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(body): ApiJson<DataEnvelope<EditProfileRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let data = body.data.unwrap_or_default();
    let first_name = non_blank(data.first_name.as_deref());
    let last_name = non_blank(data.last_name.as_deref());
    let email = non_blank(data.email.as_deref());

    let mut v = Validator::new();
    if v.check(first_name.is_some() || last_name.is_some() || email.is_some(), "data", NO_DATA) {
        if let Some(email) = email {
            v.check(looks_like_email(email), "email", "Please include a valid email");
        }
    }
    v.finish(Some(()))?;

    let uid = user.id.to_string();
    let (first, last, mail) = (
        first_name.map(str::to_string),
        last_name.map(str::to_string),
        email.map(str::to_string),
    );
    let outcome = state
        .db(move |db| {
            if let Some(mail) = mail.as_deref() {
                if let Some(existing) = db.get_user_by_email(mail)? {
                    if existing.id != uid {
                        return Ok(Err(ApiError::validation("User already exists")));
                    }
                }
            }
            let changes = UserChanges {
                first_name: first.as_deref(),
                last_name: last.as_deref(),
                email: mail.as_deref(),
            };
            let row = db.update_user(&uid, &changes)?;
            let friends = db.get_contact_ids(&uid)?;
            Ok(Ok((row, friends)))
        })
        .await?;
    let (row, friends) = outcome?;
    let row = row.ok_or_else(|| ApiError::not_found("No user found"))?;

    info!("User {} updated their profile", user.id);
    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse {
            user: row.profile(&friends)?,
        }),
    ))
}

/// DELETE /profile: removes the account and its contact links. Messages the
/// user authored stay behind.
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = user.id.to_string();
    if !state.db(move |db| db.delete_user(&uid)).await? {
        return Err(ApiError::not_found("No user found"));
    }

    info!("User {} deleted their account", user.id);
    Ok(Json(DeletedResponse { id: user.id }))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
