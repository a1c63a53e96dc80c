use axum::{
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Json,
};
use http::StatusCode;
use tracing::info;
use yamdb_dal::user::{CreateUser, NewUser, UpdateUser, UserRepository};
use yamdb_types::{Caller, Policy};

use crate::{
    auth::{guard::enforce_policy, register_pending},
    error::ApiResult,
    rest_api::{method_not_allowed, Page, Paging, Search},
    state::AppState,
    validate::Garde,
};

/// `search` matches username exactly
pub async fn list(
    repository: UserRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
    Query(search): Query<Search>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository
        .list(listing_params, search.search.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

/// Created account is pending until the user exchanges the mailed code for a token
pub async fn create(
    State(state): State<AppState>,
    repository: UserRepository,
    Garde(Json(payload)): Garde<Json<CreateUser>>,
) -> ApiResult<impl IntoResponse> {
    let user = register_pending(&state, &repository, NewUser::from(payload)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    Path(username): Path<String>,
    repository: UserRepository,
) -> ApiResult<impl IntoResponse> {
    let user = repository.get_by_username(&username).await?;
    Ok((StatusCode::OK, Json(user)))
}

pub async fn update(
    Path(username): Path<String>,
    repository: UserRepository,
    Garde(Json(payload)): Garde<Json<UpdateUser>>,
) -> ApiResult<impl IntoResponse> {
    let user = repository.update(&username, payload).await?;
    Ok((StatusCode::OK, Json(user)))
}

pub async fn delete(
    Path(username): Path<String>,
    repository: UserRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete_by_username(&username).await?;
    info!("Deleted user {username}");
    Ok((StatusCode::NO_CONTENT, ()))
}

pub async fn me(caller: Caller, repository: UserRepository) -> ApiResult<impl IntoResponse> {
    let identity = caller.require()?;
    let user = repository.get(identity.id).await?;
    Ok((StatusCode::OK, Json(user)))
}

/// Own profile, role stays unchanged
pub async fn update_me(
    caller: Caller,
    repository: UserRepository,
    Garde(Json(payload)): Garde<Json<UpdateUser>>,
) -> ApiResult<impl IntoResponse> {
    let identity = caller.require()?;
    let user = repository
        .update(&identity.username, payload.without_role())
        .await?;
    Ok((StatusCode::OK, Json(user)))
}

pub fn router() -> axum::Router<AppState> {
    let me_router = axum::Router::new()
        .route(
            "/me",
            get(me)
                .patch(update_me)
                .put(method_not_allowed)
                .delete(method_not_allowed),
        )
        .route_layer(middleware::from_fn_with_state(
            Policy::Authenticated,
            enforce_policy,
        ));

    axum::Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{username}",
            get(get_user)
                .patch(update)
                .put(method_not_allowed)
                .delete(delete),
        )
        .route_layer(middleware::from_fn_with_state(
            Policy::AdminOnly,
            enforce_policy,
        ))
        .merge(me_router)
}
