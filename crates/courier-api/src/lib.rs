pub mod access;
pub mod auth;
pub mod contacts;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod profile;
pub mod rooms;
pub mod routes;
pub mod store;
pub mod threads;
pub mod users;
pub mod validate;

#[cfg(test)]
mod test_support;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;
