use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    RequestPartsExt,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use http::request::Parts;
use tracing::debug;
use yamdb_dal::user::UserRepository;
use yamdb_types::{claim::ApiClaim, Caller};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Resolves the bearer token to a caller, requests without token are anonymous
async fn resolve_caller(parts: &mut Parts, state: &AppState) -> ApiResult<Caller> {
    let token = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
        Ok(TypedHeader(Authorization(bearer))) => bearer.token().to_string(),
        Err(e) if e.is_missing() => return Ok(Caller::Anonymous),
        Err(e) => return Err(ApiError::InvalidToken(e.to_string())),
    };

    let claim = state.tokens().validate::<ApiClaim>(&token).map_err(|e| {
        debug!("Failed to validate token: {e}");
        ApiError::InvalidToken("Token is invalid or expired".to_string())
    })?;
    let user_id = claim
        .user_id()
        .ok_or_else(|| ApiError::InvalidToken("Token has no valid subject".to_string()))?;

    let user = UserRepository::new(state.pool().clone())
        .get(user_id)
        .await
        .map_err(|e| match e {
            yamdb_dal::Error::RecordNotFound(_) => {
                ApiError::InvalidToken("User not found".to_string())
            }
            other => other.into(),
        })?;
    if !user.is_active {
        return Err(ApiError::InvalidToken("User is inactive".to_string()));
    }
    Ok(Caller::User(user.identity()))
}

/// Middleware storing the [`Caller`] into request extensions
pub async fn authenticate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    match resolve_caller(&mut parts, &state).await {
        Ok(caller) => {
            parts.extensions.insert(caller);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(e) => e.into_response(),
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Caller>() {
            Some(caller) => Ok(caller.clone()),
            None => resolve_caller(parts, state).await,
        }
    }
}
