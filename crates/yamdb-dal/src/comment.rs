use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use time::OffsetDateTime;

use crate::{error::Result, Batch, ChosenDB, Error, ListingParams};

const VALID_ORDER_FIELDS: &[&str] = &["id", "pub_date"];
const DEFAULT_ORDER: &str = "pub_date DESC, id DESC";

const SELECT_COMMENT: &str = r#"
SELECT c.id AS id, c.review_id AS review_id, c.text AS text, u.username AS author,
c.author_id AS author_id, c.pub_date AS pub_date
FROM comment c
JOIN users u ON u.id = c.author_id
"#;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    #[serde(skip)]
    pub review_id: i64,
    #[serde(skip)]
    pub author_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateComment {
    #[garde(length(min = 1))]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateComment {
    #[garde(inner(length(min = 1)))]
    pub text: Option<String>,
}

/// Location of a comment, review must belong to the title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewRef {
    pub title_id: i64,
    pub review_id: i64,
}

pub type CommentRepository = CommentRepositoryImpl<sqlx::Pool<ChosenDB>>;

pub struct CommentRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> CommentRepositoryImpl<E>
where
    for<'a> &'a E: sqlx::Executor<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    async fn check_review(&self, review: ReviewRef) -> Result<()> {
        let title: Option<i64> = sqlx::query_scalar("SELECT id FROM title WHERE id = ?")
            .bind(review.title_id)
            .fetch_optional(&self.executor)
            .await?;
        if title.is_none() {
            return Err(Error::RecordNotFound("Title".to_string()));
        }
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM review WHERE id = ? AND title_id = ?")
                .bind(review.review_id)
                .bind(review.title_id)
                .fetch_optional(&self.executor)
                .await?;
        found
            .map(|_| ())
            .ok_or_else(|| Error::RecordNotFound("Review".to_string()))
    }

    pub async fn create(
        &self,
        review: ReviewRef,
        author_id: i64,
        payload: CreateComment,
    ) -> Result<Comment> {
        self.check_review(review).await?;
        let result = sqlx::query(
            "INSERT INTO comment (review_id, author_id, text, pub_date) VALUES (?, ?, ?, ?)",
        )
        .bind(review.review_id)
        .bind(author_id)
        .bind(&payload.text)
        .bind(crate::now())
        .execute(&self.executor)
        .await?;
        self.get(review, result.last_insert_rowid()).await
    }

    pub async fn list(&self, review: ReviewRef, params: ListingParams) -> Result<Batch<Comment>> {
        self.check_review(review).await?;
        let order = params.ordering(VALID_ORDER_FIELDS, DEFAULT_ORDER)?;

        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM comment WHERE review_id = ?")
            .bind(review.review_id)
            .fetch_one(&self.executor)
            .await?;

        let mut query = QueryBuilder::<ChosenDB>::new(SELECT_COMMENT);
        query
            .push(" WHERE c.review_id = ")
            .push_bind(review.review_id)
            .push(format!(" ORDER BY {order} LIMIT "))
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset);
        let rows = query
            .build_query_as::<Comment>()
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

    pub async fn get(&self, review: ReviewRef, id: i64) -> Result<Comment> {
        self.check_review(review).await?;
        sqlx::query_as::<_, Comment>(&format!(
            "{SELECT_COMMENT} WHERE c.id = ? AND c.review_id = ?"
        ))
        .bind(id)
        .bind(review.review_id)
        .fetch_optional(&self.executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Comment".to_string()))
    }

    pub async fn update(&self, review: ReviewRef, id: i64, payload: UpdateComment) -> Result<Comment> {
        let current = self.get(review, id).await?;
        sqlx::query("UPDATE comment SET text = ? WHERE id = ?")
            .bind(payload.text.unwrap_or(current.text))
            .bind(id)
            .execute(&self.executor)
            .await?;
        self.get(review, id).await
    }

    pub async fn delete(&self, review: ReviewRef, id: i64) -> Result<()> {
        self.check_review(review).await?;
        let res = sqlx::query("DELETE FROM comment WHERE id = ? AND review_id = ?")
            .bind(id)
            .bind(review.review_id)
            .execute(&self.executor)
            .await?;
        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Comment".to_string()))
        } else {
            Ok(())
        }
    }
}
