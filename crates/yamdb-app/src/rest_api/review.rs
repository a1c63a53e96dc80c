use axum::{
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Json,
};
use http::StatusCode;
use tracing::debug;
use yamdb_dal::review::{CreateReview, ReviewRepository, UpdateReview};
use yamdb_types::{Access, Caller, Policy};

use crate::{
    auth::guard::enforce_policy,
    error::ApiResult,
    repository_from_request,
    rest_api::{method_not_allowed, Page, Paging},
    state::AppState,
    validate::{Deferred, Garde},
};

const POLICY: Policy = Policy::AuthorAdminModerOrReadOnly;

repository_from_request!(ReviewRepository);

pub async fn list(
    Path(title_id): Path<i64>,
    repository: ReviewRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(title_id, listing_params).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

pub async fn create(
    Path(title_id): Path<i64>,
    caller: Caller,
    repository: ReviewRepository,
    Garde(Json(payload)): Garde<Json<CreateReview>>,
) -> ApiResult<impl IntoResponse> {
    let author = caller.require()?;
    let review = repository.create(title_id, author.id, payload).await?;
    debug!("{} reviewed title {title_id}", author.username);
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn get_review(
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let review = repository.get(title_id, review_id).await?;
    Ok((StatusCode::OK, Json(review)))
}

pub async fn update(
    Path((title_id, review_id)): Path<(i64, i64)>,
    caller: Caller,
    repository: ReviewRepository,
    payload: Deferred<UpdateReview>,
) -> ApiResult<impl IntoResponse> {
    let review = repository.get(title_id, review_id).await?;
    POLICY.check_object(Access::Write, &caller, review.author_id)?;
    let payload = payload.validate()?;
    let review = repository.update(title_id, review_id, payload).await?;
    Ok((StatusCode::OK, Json(review)))
}

pub async fn delete(
    Path((title_id, review_id)): Path<(i64, i64)>,
    caller: Caller,
    repository: ReviewRepository,
) -> ApiResult<impl IntoResponse> {
    let review = repository.get(title_id, review_id).await?;
    POLICY.check_object(Access::Write, &caller, review.author_id)?;
    repository.delete(title_id, review_id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

/// Must be nested on `/titles/{title_id}/reviews`
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{review_id}",
            get(get_review)
                .patch(update)
                .put(method_not_allowed)
                .delete(delete),
        )
        .route_layer(middleware::from_fn_with_state(POLICY, enforce_policy))
}
