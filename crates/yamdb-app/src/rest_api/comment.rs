use axum::{
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Json,
};
use http::StatusCode;
use yamdb_dal::comment::{CommentRepository, CreateComment, ReviewRef, UpdateComment};
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

repository_from_request!(CommentRepository);

fn review_ref(title_id: i64, review_id: i64) -> ReviewRef {
    ReviewRef {
        title_id,
        review_id,
    }
}

pub async fn list(
    Path((title_id, review_id)): Path<(i64, i64)>,
    repository: CommentRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository
        .list(review_ref(title_id, review_id), listing_params)
        .await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

pub async fn create(
    Path((title_id, review_id)): Path<(i64, i64)>,
    caller: Caller,
    repository: CommentRepository,
    Garde(Json(payload)): Garde<Json<CreateComment>>,
) -> ApiResult<impl IntoResponse> {
    let author = caller.require()?;
    let comment = repository
        .create(review_ref(title_id, review_id), author.id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    let comment = repository
        .get(review_ref(title_id, review_id), comment_id)
        .await?;
    Ok((StatusCode::OK, Json(comment)))
}

pub async fn update(
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    caller: Caller,
    repository: CommentRepository,
    payload: Deferred<UpdateComment>,
) -> ApiResult<impl IntoResponse> {
    let review = review_ref(title_id, review_id);
    let comment = repository.get(review, comment_id).await?;
    POLICY.check_object(Access::Write, &caller, comment.author_id)?;
    let payload = payload.validate()?;
    let comment = repository.update(review, comment_id, payload).await?;
    Ok((StatusCode::OK, Json(comment)))
}

pub async fn delete(
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    caller: Caller,
    repository: CommentRepository,
) -> ApiResult<impl IntoResponse> {
    let review = review_ref(title_id, review_id);
    let comment = repository.get(review, comment_id).await?;
    POLICY.check_object(Access::Write, &caller, comment.author_id)?;
    repository.delete(review, comment_id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

/// Must be nested on `/titles/{title_id}/reviews/{review_id}/comments`
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{comment_id}",
            get(get_comment)
                .patch(update)
                .put(method_not_allowed)
                .delete(delete),
        )
        .route_layer(middleware::from_fn_with_state(POLICY, enforce_policy))
}
