use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use courier_types::api::{DataEnvelope, DeletedResponse, RoomRequest, RoomResponse, RoomsResponse};
use courier_types::models::Room;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::validate::Validator;

const INVALID_ROOM_ID: &str = "Invalid room ID";
const NO_ROOM_NAME: &str = "Room has no name";

pub async fn get_rooms(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db(|db| db.list_rooms()).await?;
    let rooms: Vec<Room> = rows.into_iter().map(Room::try_from).collect::<anyhow::Result<_>>()?;
    Ok(Json(RoomsResponse { rooms }))
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    let id = v.id(Some(&room_id), "roomId", INVALID_ROOM_ID);
    let id = v.finish(id)?.to_string();

    let row = state
        .db(move |db| db.get_room(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("No room found with id"))?;

    Ok(Json(RoomResponse {
        room: Room::try_from(row)?,
    }))
}

pub async fn create_room(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(body): ApiJson<DataEnvelope<RoomRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let data = body.data.unwrap_or_default();
    let mut v = Validator::new();
    let name = v.text(data.name.as_deref(), "name", NO_ROOM_NAME);
    let messages = v.ids(&data.messages.unwrap_or_default(), "messages", "Invalid message ID");
    let (name, messages) = v.finish(name.zip(messages))?;

    let room = Room {
        id: Uuid::new_v4(),
        name: name.to_string(),
        messages,
    };
    {
        let id = room.id.to_string();
        let name = room.name.clone();
        let messages: Vec<String> = room.messages.iter().map(Uuid::to_string).collect();
        state.db(move |db| db.create_room(&id, &name, &messages)).await?;
    }
    info!("User {} created room {}", user.id, room.id);

    Ok((StatusCode::CREATED, Json(RoomResponse { room })))
}

pub async fn edit_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    ApiJson(body): ApiJson<DataEnvelope<RoomRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let data = body.data.unwrap_or_default();
    let mut v = Validator::new();
    let id = v.id(Some(&room_id), "roomId", INVALID_ROOM_ID);
    let name = v.text(data.name.as_deref(), "name", NO_ROOM_NAME);
    let (id, name) = v.finish(id.zip(name))?;

    let (id, name) = (id.to_string(), name.to_string());
    let row = state
        .db(move |db| db.rename_room(&id, &name))
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    Ok((StatusCode::CREATED, Json(RoomResponse { room: Room::try_from(row)? })))
}

pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    let id = v.id(Some(&room_id), "roomId", INVALID_ROOM_ID);
    let id = v.finish(id)?;

    let rid = id.to_string();
    if !state.db(move |db| db.delete_room(&rid)).await? {
        return Err(ApiError::not_found("No room found"));
    }

    Ok(Json(DeletedResponse { id }))
}
