use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use tracing::debug;

use crate::{error::Result, Batch, ChosenDB, Error, ListingParams};

const VALID_ORDER_FIELDS: &[&str] = &["id", "pub_date", "score"];
const DEFAULT_ORDER: &str = "pub_date DESC, id DESC";

const SELECT_REVIEW: &str = r#"
SELECT r.id AS id, r.title_id AS title_id, r.text AS text, u.username AS author,
r.author_id AS author_id, r.score AS score, r.pub_date AS pub_date
FROM review r
JOIN users u ON u.id = r.author_id
"#;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub text: String,
    /// Username of the author
    pub author: String,
    pub score: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    #[serde(skip)]
    pub title_id: i64,
    #[serde(skip)]
    pub author_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReview {
    #[garde(length(min = 1))]
    pub text: String,
    #[garde(range(min = 1, max = 10))]
    pub score: i64,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateReview {
    #[garde(inner(length(min = 1)))]
    pub text: Option<String>,
    #[garde(inner(range(min = 1, max = 10)))]
    pub score: Option<i64>,
}

pub type ReviewRepository = ReviewRepositoryImpl<sqlx::Pool<ChosenDB>>;

/// Reviews are always accessed through their title
pub struct ReviewRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> ReviewRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    async fn check_title(&self, title_id: i64) -> Result<()> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM title WHERE id = ?")
            .bind(title_id)
            .fetch_optional(&self.executor)
            .await?;
        found
            .map(|_| ())
            .ok_or_else(|| Error::RecordNotFound("Title".to_string()))
    }

    /// Storage allows only one review of a title per author
    pub async fn create(
        &self,
        title_id: i64,
        author_id: i64,
        payload: CreateReview,
    ) -> Result<Review> {
        self.check_title(title_id).await?;
        let result = sqlx::query(
            "INSERT INTO review (title_id, author_id, text, score, pub_date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(title_id)
        .bind(author_id)
        .bind(&payload.text)
        .bind(payload.score)
        .bind(crate::now())
        .execute(&self.executor)
        .await?;
        let id = result.last_insert_rowid();
        debug!("Created review {id} of title {title_id}");
        self.get(title_id, id).await
    }

    pub async fn list(&self, title_id: i64, params: ListingParams) -> Result<Batch<Review>> {
        self.check_title(title_id).await?;
        let order = params.ordering(VALID_ORDER_FIELDS, DEFAULT_ORDER)?;

        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM review WHERE title_id = ?")
            .bind(title_id)
            .fetch_one(&self.executor)
            .await?;

        let mut query = QueryBuilder::<ChosenDB>::new(SELECT_REVIEW);
        query
            .push(" WHERE r.title_id = ")
            .push_bind(title_id)
            .push(format!(" ORDER BY {order} LIMIT "))
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset);
        let rows = query
            .build_query_as::<Review>()
            .fetch(&self.executor)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(Batch {
            offset: params.offset,
            limit: params.limit,
            total: total as u64,
            rows,
        })
    }

    /// Review of other title is reported as not found
    pub async fn get(&self, title_id: i64, id: i64) -> Result<Review> {
        self.check_title(title_id).await?;
        sqlx::query_as::<_, Review>(&format!(
            "{SELECT_REVIEW} WHERE r.id = ? AND r.title_id = ?"
        ))
        .bind(id)
        .bind(title_id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
    }

    /// Author, title and publication date stay unchanged
    pub async fn update(&self, title_id: i64, id: i64, payload: UpdateReview) -> Result<Review> {
        let current = self.get(title_id, id).await?;
        sqlx::query("UPDATE review SET text = ?, score = ? WHERE id = ?")
            .bind(payload.text.unwrap_or(current.text))
            .bind(payload.score.unwrap_or(current.score))
            .bind(id)
            .execute(&self.executor)
            .await?;
        self.get(title_id, id).await
    }

    pub async fn delete(&self, title_id: i64, id: i64) -> Result<()> {
        self.check_title(title_id).await?;
        let res = sqlx::query("DELETE FROM review WHERE id = ? AND title_id = ?")
            .bind(id)
            .bind(title_id)
            .execute(&self.executor)
            .await?;
        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Review".to_string()))
        } else {
            Ok(())
        }
    }
}
