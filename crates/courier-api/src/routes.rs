use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{contacts, messages, profile, rooms, users};

/// Every route under `/api`. Everything except registration and login sits
/// behind `require_auth`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/messages", get(messages::list_threads).post(messages::create_message))
        .route(
            "/messages/{message_id}",
            get(messages::get_message)
                .put(messages::edit_message)
                .delete(messages::delete_message),
        )
        .route("/messages/{message_id}/thread", get(messages::get_thread))
        .route("/contacts", get(contacts::get_contacts).put(contacts::add_contact))
        .route(
            "/contacts/{contact_id}",
            get(contacts::get_contact).delete(contacts::delete_contact),
        )
        .route("/rooms", get(rooms::get_rooms).post(rooms::create_room))
        .route(
            "/rooms/{room_id}",
            get(rooms::get_room).put(rooms::edit_room).delete(rooms::delete_room),
        )
        .route(
            "/profile",
            get(profile::get_profile)
                .put(profile::edit_profile)
                .delete(profile::delete_profile),
        )
        .route("/users", get(users::get_users))
        .route("/users/search", get(users::search_users))
        .route("/users/{user_id}", get(users::get_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(state)
}
