/// Endpoints and router for slug identified lookup tables. Records can be
/// listed, created and deleted; single record reads and updates are not
/// supported and answer 405.
#[macro_export]
macro_rules! slug_api {
    ($entity:ty) => {
        type EntityRepository = paste::paste! {[<$entity Repository>]};
        $crate::repository_from_request!(EntityRepository);

        pub mod crud_api {
            use super::*;
            use $crate::error::ApiResult;
            use $crate::rest_api::{Page, Paging, Search};
            use $crate::state::AppState;
            use $crate::validate::Garde;
            use axum::{
                extract::{Path, Query, State},
                response::IntoResponse,
                Json,
            };
            use http::StatusCode;

            type CreateEntity = paste::paste! {[<Create $entity>]};

            pub async fn list(
                repository: EntityRepository,
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

            pub async fn create(
                repository: EntityRepository,
                Garde(Json(payload)): Garde<Json<CreateEntity>>,
            ) -> ApiResult<impl IntoResponse> {
                let record = repository.create(payload).await?;
                Ok((StatusCode::CREATED, Json(record)))
            }

            pub async fn delete(
                Path(slug): Path<String>,
                repository: EntityRepository,
            ) -> ApiResult<impl IntoResponse> {
                repository.delete_by_slug(&slug).await?;
                Ok((StatusCode::NO_CONTENT, ()))
            }
        }

        pub fn router() -> axum::Router<$crate::state::AppState> {
            use axum::{middleware, routing::get};
            use $crate::{auth::guard::enforce_policy, rest_api::method_not_allowed};
            use yamdb_types::Policy;

            axum::Router::new()
                .route("/", get(crud_api::list).post(crud_api::create))
                .route(
                    "/{slug}",
                    get(method_not_allowed)
                        .put(method_not_allowed)
                        .patch(method_not_allowed)
                        .delete(crud_api::delete),
                )
                .route_layer(middleware::from_fn_with_state(
                    Policy::AdminOrReadOnly,
                    enforce_policy,
                ))
        }
    };
}
