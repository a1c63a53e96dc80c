pub mod category;
pub mod comment;
pub mod genre;
pub mod macros;
pub mod review;
pub mod title;
pub mod user;

use garde::Validate;
use serde::{Deserialize, Serialize};
use yamdb_dal::{Batch, ListingParams, Order};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Clone, Default, Validate, Deserialize)]
pub struct Paging {
    #[garde(inner(range(min = 1)))]
    page: Option<u32>,
    #[garde(inner(range(min = 1, max = 1000)))]
    page_size: Option<u32>,
    #[garde(inner(length(max = 255)))]
    sort: Option<String>,
}

impl Paging {
    pub fn into_listing_params(self, default_page_size: u32) -> ApiResult<ListingParams> {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self.page_size(default_page_size);
        let offset = i64::from(page - 1) * i64::from(page_size);
        let order = self
            .sort
            .map(|orderings| {
                orderings
                    .split(',')
                    .map(|name| {
                        let (field_name, descending) = match name.trim() {
                            "" => {
                                return Err(ApiError::InvalidQuery(
                                    "Empty ordering name".to_string(),
                                ))
                            }
                            name if name.len() > 100 => {
                                return Err(ApiError::InvalidQuery(
                                    "Ordering name too long".to_string(),
                                ))
                            }
                            name if name.starts_with('+') => (&name[1..], false),
                            name if name.starts_with('-') => (&name[1..], true),
                            name => (name, false),
                        };

                        let order = if descending {
                            Order::Desc(field_name.to_string())
                        } else {
                            Order::Asc(field_name.to_string())
                        };

                        Ok(order)
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(ListingParams {
            offset,
            limit: page_size.into(),
            order,
        })
    }

    pub fn page_size(&self, default_page_size: u32) -> u32 {
        self.page_size.unwrap_or(default_page_size).max(1)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u64,
    pub page_size: u32,
    pub total_pages: u64,
    pub total: u64,
    pub rows: Vec<T>,
}

impl<T> Page<T>
where
    T: Serialize,
{
    pub fn from_batch(batch: Batch<T>, page_size: u32) -> Self {
        let size = u64::from(page_size.max(1));
        Self {
            page: batch.offset.max(0) as u64 / size + 1,
            page_size,
            total_pages: batch.total.div_ceil(size),
            total: batch.total,
            rows: batch.rows,
        }
    }
}

/// Substring or exact match search, depending on resource
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Search {
    pub search: Option<String>,
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// All resources, nest under `/api/v1`
pub fn api_router() -> axum::Router<AppState> {
    axum::Router::new()
        .nest("/auth", crate::auth::auth_router())
        .nest("/users", user::router())
        .nest("/categories", category::router())
        .nest("/genres", genre::router())
        .nest("/titles", title::router())
        .nest("/titles/{title_id}/reviews", review::router())
        .nest(
            "/titles/{title_id}/reviews/{review_id}/comments",
            comment::router(),
        )
}
