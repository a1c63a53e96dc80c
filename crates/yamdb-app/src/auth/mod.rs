pub mod guard;
pub mod token;

use axum::{extract::State, response::IntoResponse, routing::post, Json};
use garde::Validate;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use yamdb_auth::code::ConfirmationCode;
use yamdb_dal::{
    error::DUPLICATE_EMAIL,
    user::{NewUser, User, UserRepository},
};
use yamdb_types::{
    claim::ApiClaim,
    general::{is_present, validate_username},
};

use crate::{
    error::{field_errors, ApiError, ApiResult},
    repository_from_request,
    state::AppState,
    validate::{Deferred, Garde},
};

repository_from_request!(UserRepository);

/// Inserts a pending user and mails the confirmation code, the user is not
/// stored when mail delivery fails
pub(crate) async fn register_pending(
    state: &AppState,
    repository: &UserRepository,
    new_user: NewUser,
) -> ApiResult<User> {
    let code = ConfirmationCode::generate();
    let mailed_code = code.clone();
    let mailer = state.mailer();
    let template = state.mail_template();
    let user = repository
        .register(new_user, code.as_ref(), |user| async move {
            mailer
                .send(template.confirmation(&user.username, &user.email, &mailed_code))
                .await
        })
        .await?;
    info!("Registered user {}, confirmation code sent", user.username);
    Ok(user)
}

fn required(value: Option<String>) -> ApiResult<String> {
    // Validated payloads always have required fields
    value.ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Required field missing after validation")))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupPayload {
    #[garde(custom(is_present), inner(custom(validate_username)))]
    pub username: Option<String>,
    #[garde(custom(is_present), inner(email, length(max = 254)))]
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

/// Taken email is reported together with any other invalid field
async fn check_signup(payload: &SignupPayload, repository: &UserRepository) -> ApiResult<()> {
    let Err(report) = payload.validate() else {
        return Ok(());
    };
    let mut errors = field_errors(&report);
    if let Some(email) = payload.email.as_deref() {
        if !errors.contains_key("email") && repository.email_exists(email).await? {
            errors.insert("email".to_string(), vec![DUPLICATE_EMAIL.to_string()]);
        }
    }
    Err(ApiError::Validation(errors))
}

pub async fn signup(
    State(state): State<AppState>,
    repository: UserRepository,
    payload: Deferred<SignupPayload>,
) -> ApiResult<impl IntoResponse> {
    let payload = payload.parse()?;
    check_signup(&payload, &repository).await?;
    let new_user = NewUser::new(required(payload.username)?, required(payload.email)?);
    let user = register_pending(&state, &repository, new_user).await?;
    Ok((
        StatusCode::OK,
        Json(SignupResponse {
            username: user.username,
            email: user.email,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenPayload {
    #[garde(custom(is_present))]
    pub username: Option<String>,
    #[garde(custom(is_present))]
    pub confirmation_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Exchanges the confirmation code for an access token, succeeds once per code
pub async fn obtain_token(
    State(state): State<AppState>,
    repository: UserRepository,
    Garde(Json(payload)): Garde<Json<TokenPayload>>,
) -> ApiResult<impl IntoResponse> {
    let username = required(payload.username)?;
    let code = required(payload.confirmation_code)?;
    let user = repository.activate(&username, &code).await?;

    let claim = ApiClaim::new_expired(user.id, &user.username);
    let token = state.tokens().issue(claim)?;
    debug!("Issued token for {}", user.username);
    Ok((StatusCode::OK, Json(TokenResponse { token })))
}

/// Builds authentication router - must be nested on /auth path!
pub fn auth_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/signup", post(signup))
        .route("/token", post(obtain_token))
}
