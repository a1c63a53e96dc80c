use axum::{
    extract::{Path, Query, State},
    middleware,
    response::IntoResponse,
    routing::get,
    Json,
};
use http::StatusCode;
use tracing::debug;
use yamdb_dal::title::{CreateTitle, TitleFilter, TitleRepository, UpdateTitle};
use yamdb_types::Policy;

use crate::{
    auth::guard::enforce_policy,
    error::ApiResult,
    repository_from_request,
    rest_api::{method_not_allowed, Page, Paging},
    state::AppState,
    validate::Garde,
};

repository_from_request!(TitleRepository);

pub async fn list(
    repository: TitleRepository,
    State(state): State<AppState>,
    Garde(Query(paging)): Garde<Query<Paging>>,
    Query(filter): Query<TitleFilter>,
) -> ApiResult<impl IntoResponse> {
    let default_page_size = state.config().default_page_size;
    let page_size = paging.page_size(default_page_size);
    let listing_params = paging.into_listing_params(default_page_size)?;
    let batch = repository.list(listing_params, &filter).await?;
    Ok((StatusCode::OK, Json(Page::from_batch(batch, page_size))))
}

pub async fn create(
    repository: TitleRepository,
    Garde(Json(payload)): Garde<Json<CreateTitle>>,
) -> ApiResult<impl IntoResponse> {
    let title = repository.create(payload).await?;
    debug!("Created title {} ({})", title.name, title.id);
    Ok((StatusCode::CREATED, Json(title)))
}

pub async fn get_title(
    Path(title_id): Path<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    let title = repository.get(title_id).await?;
    Ok((StatusCode::OK, Json(title)))
}

pub async fn update(
    Path(title_id): Path<i64>,
    repository: TitleRepository,
    Garde(Json(payload)): Garde<Json<UpdateTitle>>,
) -> ApiResult<impl IntoResponse> {
    let title = repository.update(title_id, payload).await?;
    Ok((StatusCode::OK, Json(title)))
}

pub async fn delete(
    Path(title_id): Path<i64>,
    repository: TitleRepository,
) -> ApiResult<impl IntoResponse> {
    repository.delete(title_id).await?;
    Ok((StatusCode::NO_CONTENT, ()))
}

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{title_id}",
            get(get_title)
                .patch(update)
                .put(method_not_allowed)
                .delete(delete),
        )
        .route_layer(middleware::from_fn_with_state(
            Policy::AdminOrReadOnly,
            enforce_policy,
        ))
}
