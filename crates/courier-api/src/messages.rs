use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use courier_types::api::{
    CreateMessageRequest, DataEnvelope, DeletedResponse, EditMessageRequest, SingleMessageResponse,
    ThreadResponse, ThreadsResponse,
};
use courier_types::events::MessageEvent;

use crate::access::MessageAccess;
use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::threads::{ThreadBuilder, enrich_message, enrich_threads};
use crate::validate::Validator;

const INVALID_MESSAGE_ID: &str = "Invalid message ID";

/// GET /messages: every thread the caller can see, heads in store order.
pub async fn list_threads(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.store();
    let threads = ThreadBuilder::new(&store, state.max_thread_depth)
        .build(user.id)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;
    let messages = enrich_threads(&store, threads).await?;

    Ok(Json(ThreadsResponse { messages }))
}

pub async fn get_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    let id = v.id(Some(&message_id), "messageId", INVALID_MESSAGE_ID);
    let id = v.finish(id)?;

    let store = state.store();
    let message = MessageAccess::new(&store, state.max_thread_depth).get(user.id, id).await?;
    let message = enrich_message(&store, message).await?;

    Ok(Json(SingleMessageResponse { message }))
}

/// GET /messages/{message_id}/thread: the thread headed by `message_id`.
pub async fn get_thread(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    let id = v.id(Some(&message_id), "messageId", INVALID_MESSAGE_ID);
    let id = v.finish(id)?;

    let store = state.store();
    let thread = MessageAccess::new(&store, state.max_thread_depth).thread(user.id, id).await?;
    let mut threads = enrich_threads(&store, vec![thread]).await?;

    Ok(Json(ThreadResponse {
        thread: threads.pop().unwrap_or_default(),
    }))
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(body): ApiJson<DataEnvelope<CreateMessageRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let data = body.data.unwrap_or_default();
    let mut v = Validator::new();
    let content = v.text(data.content.as_deref(), "content", "Message has no content");
    let participants = v.ids(&data.participants.unwrap_or_default(), "participants", "Invalid participant ID");
    let parent_id = v.optional_id(data.parent_id.as_deref(), "parentId", "Invalid parent ID");
    let (content, participants, parent_id) =
        v.finish((|| Some((content?, participants?, parent_id?)))())?;

    let store = state.store();
    let message = MessageAccess::new(&store, state.max_thread_depth)
        .create(user.id, content, participants, parent_id)
        .await?;
    let message = enrich_message(&store, message).await?;

    state.dispatcher.publish(MessageEvent::MessageCreate {
        message: message.clone(),
    });

    Ok((StatusCode::CREATED, Json(SingleMessageResponse { message })))
}

pub async fn edit_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(message_id): Path<String>,
    ApiJson(body): ApiJson<DataEnvelope<EditMessageRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let data = body.data.unwrap_or_default();
    let mut v = Validator::new();
    let id = v.id(Some(&message_id), "messageId", INVALID_MESSAGE_ID);
    let content = v.text(data.content.as_deref(), "content", "Message has no content");
    let (id, content) = v.finish(id.zip(content))?;

    let store = state.store();
    let message = MessageAccess::new(&store, state.max_thread_depth)
        .edit(user.id, id, content)
        .await?;
    let message = enrich_message(&store, message).await?;

    state.dispatcher.publish(MessageEvent::MessageUpdate {
        message: message.clone(),
    });

    Ok((StatusCode::CREATED, Json(SingleMessageResponse { message })))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    let id = v.id(Some(&message_id), "messageId", INVALID_MESSAGE_ID);
    let id = v.finish(id)?;

    let store = state.store();
    let id = MessageAccess::new(&store, state.max_thread_depth)
        .delete(user.id, id)
        .await?;

    state.dispatcher.publish(MessageEvent::MessageDelete { id });

    Ok(Json(DeletedResponse { id }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use courier_types::events::MessageEvent;

    use crate::test_support::TestApp;

    fn id_of(body: &Value) -> String {
        body["message"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn rejects_missing_token() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/api/messages", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authorized, no token");
        assert_eq!(body["status"], 401);
    }

    #[tokio::test]
    async fn reply_chain_lists_as_one_thread() {
        let app = TestApp::new();
        let alice = app.user("Alice");
        let bob = app.user("Bob");

        let (status, m1) = app
            .post(
                "/api/messages",
                &alice,
                json!({ "data": { "content": "  hello  ", "participants": [bob.id] } }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(m1["message"]["content"], "hello");
        assert_eq!(m1["message"]["author"]["firstName"], "Alice");
        assert_eq!(m1["message"]["parentId"], Value::Null);
        let m1_id = id_of(&m1);

        let (status, m2) = app
            .post(
                "/api/messages",
                &bob,
                json!({ "data": { "content": "hi back", "parentId": m1_id } }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let m2_id = id_of(&m2);

        for user in [&alice, &bob] {
            let (status, body) = app.get("/api/messages", user).await;
            assert_eq!(status, StatusCode::OK);
            let threads = body["messages"].as_array().unwrap();
            assert_eq!(threads.len(), 1);
            let ids: Vec<&str> = threads[0]
                .as_array()
                .unwrap()
                .iter()
                .map(|m| m["id"].as_str().unwrap())
                .collect();
            assert_eq!(ids, vec![m1_id.as_str(), m2_id.as_str()]);
        }

        let (status, body) = app.get(&format!("/api/messages/{}/thread", m1_id), &bob).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["thread"].as_array().unwrap().len(), 2);

        let (status, body) = app.get(&format!("/api/messages/{}/thread", m2_id), &bob).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Message is not a thread head");
    }

    #[tokio::test]
    async fn deleting_head_hides_the_thread() {
        let app = TestApp::new();
        let alice = app.user("Alice");

        let (_, m1) = app.post("/api/messages", &alice, json!({ "data": { "content": "first" } })).await;
        let m1_id = id_of(&m1);
        app.post(
            "/api/messages",
            &alice,
            json!({ "data": { "content": "second", "parentId": m1_id } }),
        )
        .await;

        let (status, body) = app.delete(&format!("/api/messages/{}", m1_id), &alice).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], m1_id.as_str());

        let (_, body) = app.get("/api/messages", &alice).await;
        assert_eq!(body["messages"], json!([]));
    }

    #[tokio::test]
    async fn strangers_cannot_read_or_reply() {
        let app = TestApp::new();
        let alice = app.user("Alice");
        let eve = app.user("Eve");

        let (_, m1) = app.post("/api/messages", &alice, json!({ "data": { "content": "private" } })).await;
        let m1_id = id_of(&m1);

        let (status, body) = app.get(&format!("/api/messages/{}", m1_id), &eve).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Not authorized, message not visible to user");

        let (status, _) = app
            .post(
                "/api/messages",
                &eve,
                json!({ "data": { "content": "let me in", "parentId": m1_id } }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, body) = app.get("/api/messages", &eve).await;
        assert_eq!(body["messages"], json!([]));
    }

    #[tokio::test]
    async fn only_the_author_edits_or_deletes() {
        let app = TestApp::new();
        let alice = app.user("Alice");
        let bob = app.user("Bob");

        let (_, m1) = app
            .post(
                "/api/messages",
                &alice,
                json!({ "data": { "content": "draft", "participants": [bob.id] } }),
            )
            .await;
        let uri = format!("/api/messages/{}", id_of(&m1));

        let (status, body) = app.put(&uri, &bob, json!({ "data": { "content": "mine now" } })).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Cannot alter message when author and user ids do not match");

        let (status, _) = app.delete(&uri, &bob).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app.put(&uri, &alice, json!({ "data": { "content": "final" } })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"]["content"], "final");
    }

    #[tokio::test]
    async fn validates_ids_and_content() {
        let app = TestApp::new();
        let alice = app.user("Alice");

        let (status, body) = app.get("/api/messages/not-a-uuid", &alice).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid message ID");

        let (status, body) = app.post("/api/messages", &alice, json!({ "data": { "content": "   " } })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Message has no content");

        let (status, body) = app
            .post(
                "/api/messages",
                &alice,
                json!({ "data": { "content": "hi", "participants": [uuid::Uuid::new_v4()] } }),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No participant found");
    }

    #[tokio::test]
    async fn writes_publish_events() {
        let app = TestApp::new();
        let alice = app.user("Alice");
        let mut events = app.state.dispatcher.subscribe();

        let (_, m1) = app.post("/api/messages", &alice, json!({ "data": { "content": "ping" } })).await;
        let m1_id = id_of(&m1);
        app.delete(&format!("/api/messages/{}", m1_id), &alice).await;

        match events.recv().await.unwrap() {
            MessageEvent::MessageCreate { message } => assert_eq!(message.content, "ping"),
            other => panic!("unexpected event: {:?}", other),
        }
        match events.recv().await.unwrap() {
            MessageEvent::MessageDelete { id } => assert_eq!(id.to_string(), m1_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn reply_participants_cannot_see_or_extend_a_hidden_thread() {
        let app = TestApp::new();
        let alice = app.user("Alice");
        let carol = app.user("Carol");

        let (_, head) = app.post("/api/messages", &alice, json!({ "data": { "content": "notes" } })).await;
        let head_id = id_of(&head);
        let (_, reply) = app
            .post(
                "/api/messages",
                &alice,
                json!({ "data": { "content": "cc carol", "participants": [carol.id], "parentId": head_id } }),
            )
            .await;
        let reply_id = id_of(&reply);

        let (status, _) = app.get(&format!("/api/messages/{}", reply_id), &carol).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .post(
                "/api/messages",
                &carol,
                json!({ "data": { "content": "me too", "parentId": reply_id } }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Not authorized to reply to this message");

        let (_, body) = app.get("/api/messages", &carol).await;
        assert_eq!(body["messages"], json!([]));
        let (_, body) = app.get(&format!("/api/messages/{}/thread", head_id), &alice).await;
        assert_eq!(body["thread"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn null_participants_means_none() {
        let app = TestApp::new();
        let alice = app.user("Alice");

        let (status, body) = app
            .post(
                "/api/messages",
                &alice,
                json!({ "data": { "content": "solo", "participants": null, "parentId": null } }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"]["participants"], json!([]));
    }
}
