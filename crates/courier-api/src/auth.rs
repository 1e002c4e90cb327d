use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use courier_db::Database;
use courier_db::models::UserRow;
use courier_gateway::dispatcher::Dispatcher;
use courier_types::api::{AuthResponse, Claims, DataEnvelope, LoginRequest, RegisterRequest};
use courier_types::models::Account;

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::store::{SqliteStore, blocking};
use crate::validate::Validator;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub max_thread_depth: usize,
    pub dispatcher: Dispatcher,
}

impl AppStateInner {
    /// Run a blocking database call off the async runtime.
    pub async fn db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        Ok(blocking(&self.db, f).await?)
    }

    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(self.db.clone())
    }
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DataEnvelope<RegisterRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    v.check(body.data.is_some(), "data", "No user data submitted");
    let data = body.data.unwrap_or_default();
    let first_name = v.text(data.first_name.as_deref(), "firstName", "No first name");
    let last_name = v.text(data.last_name.as_deref(), "lastName", "No last name");
    let email = v.email(data.email.as_deref(), "email", "No email", "Please include a valid email");
    let password = v.text(data.password.as_deref(), "password", "No password");
    let (first_name, last_name, email, password) =
        v.finish((|| Some((first_name?, last_name?, email?, password?)))())?;

    let (first_name, last_name, email) = (first_name.to_string(), last_name.to_string(), email.to_string());

    let lookup = email.clone();
    if state.db(move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(ApiError::validation("User already exists"));
    }

    let password_hash = hash_password(password.to_string()).await?;
    let user_id = Uuid::new_v4();

    insert_user(&state, user_id, &first_name, &last_name, &email, password_hash).await?;

    let token = create_token(&state.jwt_secret, user_id, state.token_ttl)?;
    info!("Registered user {}", user_id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: Account {
                id: user_id,
                first_name,
                last_name,
                email,
                friends: vec![],
            },
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DataEnvelope<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::new();
    v.check(body.data.is_some(), "data", "No user submitted");
    let data = body.data.unwrap_or_default();
    let email = v.email(data.email.as_deref(), "email", "No email", "Please include a valid email");
    let password = v.text(data.password.as_deref(), "password", "No password");
    let (email, password) = v.finish(email.zip(password))?;

    let lookup = email.to_string();
    let user = state
        .db(move |db| db.get_user_by_email(&lookup))
        .await?
        .ok_or_else(|| ApiError::validation("No user with that email"))?;

    verify_password(password.to_string(), user.password.clone()).await?;

    let user_id: Uuid = user.id.parse().map_err(anyhow::Error::from)?;
    let account = load_account(&state, user).await?;
    let token = create_token(&state.jwt_secret, user_id, state.token_ttl)?;

    Ok(Json(AuthResponse { user: account, token }))
}

/// The earlier email lookup can race another registration; the unique
/// index settles it.
async fn insert_user(
    state: &AppStateInner,
    user_id: Uuid,
    first_name: &str,
    last_name: &str,
    email: &str,
    password_hash: String,
) -> Result<(), ApiError> {
    let (id, first, last, mail) = (
        user_id.to_string(),
        first_name.to_string(),
        last_name.to_string(),
        email.to_string(),
    );
    let inserted = state
        .db(move |db| db.create_user(&id, &first, &last, &mail, &password_hash))
        .await?;
    if !inserted {
        return Err(ApiError::validation("User already exists"));
    }
    Ok(())
}

async fn load_account(state: &AppStateInner, user: UserRow) -> Result<Account, ApiError> {
    let uid = user.id.clone();
    let friends = state.db(move |db| db.get_contacts(&uid)).await?;
    let summary = user.summary()?;

    Ok(Account {
        id: summary.id,
        first_name: summary.first_name,
        last_name: summary.last_name,
        email: summary.email,
        friends: friends.iter().map(UserRow::summary).collect::<anyhow::Result<_>>()?,
    })
}

/// Argon2id with a fresh salt. Runs on the blocking pool.
async fn hash_password(password: String) -> Result<String, ApiError> {
    let hash = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;
    Ok(hash)
}

async fn verify_password(password: String, stored: String) -> Result<(), ApiError> {
    let matched = tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored).map_err(|e| anyhow::anyhow!("corrupt password hash: {}", e))?;
        Ok::<_, anyhow::Error>(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    if matched {
        Ok(())
    } else {
        Err(ApiError::unauthenticated("Incorrect password"))
    }
}

pub fn create_token(secret: &str, user_id: Uuid, ttl: chrono::Duration) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
