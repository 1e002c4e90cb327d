use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;
use uuid::Uuid;

use courier_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// The authenticated caller, attached to the request by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
}

/// Resolve the bearer token to an existing user before any handler runs.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| ApiError::unauthenticated("Not authorized, no token"))?;

    let claims = decode_token(bearer.token(), &state.jwt_secret)?;

    let uid = claims.sub.to_string();
    if state.db(move |db| db.get_user_by_id(&uid)).await?.is_none() {
        return Err(ApiError::unauthenticated("Not authorized, no user found"));
    }

    req.extensions_mut().insert(CurrentUser { id: claims.sub });
    Ok(next.run(req).await)
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::unauthenticated("Not authorized, invalid token")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::create_token;

    #[test]
    fn issued_tokens_decode_to_the_same_user() {
        let user = Uuid::new_v4();
        let token = create_token("secret", user, chrono::Duration::days(1)).unwrap();
        assert_eq!(decode_token(&token, "secret").unwrap().sub, user);
    }

    #[test]
    fn wrong_secret_and_expired_tokens_are_rejected() {
        let user = Uuid::new_v4();
        let token = create_token("secret", user, chrono::Duration::days(1)).unwrap();
        assert!(matches!(decode_token(&token, "other"), Err(ApiError::Unauthenticated(_))));

        let stale = create_token("secret", user, chrono::Duration::days(-1)).unwrap();
        assert!(decode_token(&stale, "secret").is_err());
    }
}
