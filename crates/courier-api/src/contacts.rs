use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use courier_db::models::UserRow;
use courier_types::api::{AddContactRequest, ContactResponse, ContactsResponse};
use courier_types::models::UserSummary;

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::validate::Validator;

const INVALID_CONTACT_ID: &str = "Invalid contact ID";

pub async fn get_contacts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let contacts = contacts_of(&state, user.id.to_string()).await?;
    Ok(Json(ContactsResponse { contacts }))
}

/// PUT /contacts: append a contact to the caller's list.
pub async fn add_contact(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(body): ApiJson<AddContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    let contact_id = v.id(body.contact_id.as_deref(), "contactId", INVALID_CONTACT_ID);
    if let Some(cid) = contact_id {
        v.check(cid != user.id, "contactId", INVALID_CONTACT_ID);
    }
    let contact_id = v.finish(contact_id)?;

    let (uid, cid) = (user.id.to_string(), contact_id.to_string());
    let added = state
        .db(move |db| {
            if db.get_user_by_id(&cid)?.is_none() {
                return Ok(None);
            }
            Ok(Some(db.add_contact(&uid, &cid)?))
        })
        .await?;

    match added {
        None => return Err(ApiError::not_found("No user found")),
        Some(false) => return Err(ApiError::validation("Contact already listed")),
        Some(true) => {}
    }

    let contacts = contacts_of(&state, user.id.to_string()).await?;
    Ok((StatusCode::CREATED, Json(ContactsResponse { contacts })))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(contact_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let contact_id = parse_contact_id(&contact_id)?;

    let (uid, cid) = (user.id.to_string(), contact_id.to_string());
    let contact = state
        .db(move |db| {
            if !db.is_contact(&uid, &cid)? {
                return Ok(None);
            }
            db.get_user_by_id(&cid)
        })
        .await?
        .ok_or_else(|| ApiError::validation("Contact not friend"))?;

    Ok(Json(ContactResponse {
        contact: contact.summary()?,
    }))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(contact_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let contact_id = parse_contact_id(&contact_id)?;

    let (uid, cid) = (user.id.to_string(), contact_id.to_string());
    let removed = state.db(move |db| db.remove_contact(&uid, &cid)).await?;
    if !removed {
        return Err(ApiError::validation("Contact not friend"));
    }

    let contacts = contacts_of(&state, user.id.to_string()).await?;
    Ok((StatusCode::CREATED, Json(ContactsResponse { contacts })))
}

fn parse_contact_id(raw: &str) -> Result<uuid::Uuid, ApiError> {
    let mut v = Validator::new();
    let id = v.id(Some(raw), "contactId", INVALID_CONTACT_ID);
    v.finish(id)
}

async fn contacts_of(state: &AppStateInner, user_id: String) -> Result<Vec<UserSummary>, ApiError> {
    let rows = state.db(move |db| db.get_contacts(&user_id)).await?;
    Ok(rows.iter().map(UserRow::summary).collect::<anyhow::Result<Vec<_>>>()?)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn contact_lifecycle() {
        let app = TestApp::new();
        let alice = app.user("Alice");
        let bob = app.user("Bob");

        let (status, body) = app.put("/api/contacts", &alice, json!({ "contactId": bob.id })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["contacts"][0]["firstName"], "Bob");

        let (status, body) = app.put("/api/contacts", &alice, json!({ "contactId": bob.id })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Contact already listed");

        let (status, body) = app.get(&format!("/api/contacts/{}", bob.id), &alice).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["contact"]["id"], bob.id.to_string());

        // Contacts are one-directional.
        let (status, body) = app.get(&format!("/api/contacts/{}", alice.id), &bob).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Contact not friend");

        let (status, body) = app.delete(&format!("/api/contacts/{}", bob.id), &alice).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["contacts"], json!([]));
    }

    #[tokio::test]
    async fn rejects_self_and_unknown_contacts() {
        let app = TestApp::new();
        let alice = app.user("Alice");

        let (status, body) = app.put("/api/contacts", &alice, json!({ "contactId": alice.id })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid contact ID");

        let (status, body) = app
            .put("/api/contacts", &alice, json!({ "contactId": uuid::Uuid::new_v4() }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No user found");
    }
}
