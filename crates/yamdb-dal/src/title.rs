use std::collections::HashMap;

use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire as _, QueryBuilder, Row as _};
use tracing::debug;
use yamdb_types::general::{nullable, validate_slug, validate_year, YearRange};

use crate::{
    category::Category, error::Result, genre::Genre, Batch, ChosenDB, ChosenRow, Error,
    ListingParams,
};

const VALID_ORDER_FIELDS: &[&str] = &["id", "name", "year", "rating"];
const DEFAULT_ORDER: &str = "name, id";

const SELECT_TITLE: &str = r#"
SELECT t.id AS id, t.name AS name, t.year AS year, t.description AS description,
t.category_id AS category_id, c.name AS category_name, c.slug AS category_slug,
(SELECT AVG(r.score) FROM review r WHERE r.title_id = t.id) AS rating
FROM title t
LEFT JOIN category c ON t.category_id = c.id
"#;

const COUNT_TITLE: &str = r#"
SELECT count(*) FROM title t
LEFT JOIN category c ON t.category_id = c.id
"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i32,
    /// Mean of review scores, `None` without reviews
    pub rating: Option<f64>,
    pub description: Option<String>,
    pub genre: Vec<Genre>,
    pub category: Option<Category>,
}

impl sqlx::FromRow<'_, ChosenRow> for Title {
    fn from_row(row: &ChosenRow) -> Result<Self, sqlx::Error> {
        let category = match row.try_get::<Option<i64>, _>("category_id")? {
            Some(id) => Some(Category {
                id,
                name: row.try_get("category_name")?,
                slug: row.try_get("category_slug")?,
            }),
            None => None,
        };
        Ok(Title {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            year: row.try_get("year")?,
            rating: row.try_get("rating")?,
            description: row.try_get("description")?,
            genre: Vec::new(),
            category,
        })
    }
}

/// Category and genres are referenced by slug, category is optional
#[derive(Debug, Clone, Deserialize, Validate)]
#[garde(context(YearRange))]
pub struct CreateTitle {
    #[garde(length(chars, min = 1, max = 256))]
    pub name: String,
    #[garde(custom(validate_year))]
    pub year: i32,
    #[serde(default)]
    #[garde(skip)]
    pub description: Option<String>,
    #[serde(default)]
    #[garde(inner(custom(validate_slug)))]
    pub category: Option<String>,
    #[garde(inner(custom(validate_slug)))]
    pub genre: Vec<String>,
}

/// Partial update, explicit `null` clears description or category
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[garde(context(YearRange))]
pub struct UpdateTitle {
    #[garde(inner(length(chars, min = 1, max = 256)))]
    pub name: Option<String>,
    #[garde(inner(custom(validate_year)))]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    #[garde(skip)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[garde(inner(inner(custom(validate_slug))))]
    pub category: Option<Option<String>>,
    #[garde(inner(inner(custom(validate_slug))))]
    pub genre: Option<Vec<String>>,
}

/// Listing filters, slugs and name match as substrings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    pub category: Option<String>,
    pub genre: Option<String>,
    pub name: Option<String>,
    pub year: Option<i32>,
}

impl TitleFilter {
    fn push_where<'args>(&'args self, query: &mut QueryBuilder<'args, ChosenDB>) {
        let mut first = true;
        let mut separator = || if std::mem::take(&mut first) { " WHERE " } else { " AND " };
        if let Some(category) = &self.category {
            query
                .push(separator())
                .push("instr(c.slug, ")
                .push_bind(category)
                .push(") > 0");
        }
        if let Some(genre) = &self.genre {
            query
                .push(separator())
                .push(
                    "EXISTS (SELECT 1 FROM genre_title gt JOIN genre g ON g.id = gt.genre_id \
                    WHERE gt.title_id = t.id AND instr(g.slug, ",
                )
                .push_bind(genre)
                .push(") > 0)");
        }
        if let Some(name) = &self.name {
            query
                .push(separator())
                .push("instr(t.name, ")
                .push_bind(name)
                .push(") > 0");
        }
        if let Some(year) = self.year {
            query.push(separator()).push("t.year = ").push_bind(year);
        }
    }
}

pub type TitleRepository = TitleRepositoryImpl<sqlx::Pool<ChosenDB>>;

pub struct TitleRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> TitleRepositoryImpl<E>
where
    for<'a> &'a E:
        sqlx::Executor<'c, Database = ChosenDB> + sqlx::Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub async fn create(&self, payload: CreateTitle) -> Result<Title> {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;

        let category_id = match &payload.category {
            Some(slug) => Some(category_id(slug, &mut *transaction).await?),
            None => None,
        };
        let genre_ids = genre_ids(&payload.genre, &mut *transaction).await?;
        let result =
            sqlx::query("INSERT INTO title (name, year, description, category_id) VALUES (?, ?, ?, ?)")
                .bind(&payload.name)
                .bind(payload.year)
                .bind(&payload.description)
                .bind(category_id)
                .execute(&mut *transaction)
                .await?;
        let id = result.last_insert_rowid();
        link_genres(id, &genre_ids, &mut transaction).await?;

        let title = get(id, &mut transaction).await?;
        transaction.commit().await?;
        debug!("Created title {} ({})", title.name, title.id);
        Ok(title)
    }

    /// Partial update, genres are replaced when present
    pub async fn update(&self, id: i64, payload: UpdateTitle) -> Result<Title> {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let current = get(id, &mut transaction).await?;

        let category_id = match &payload.category {
            Some(Some(slug)) => Some(category_id(slug, &mut *transaction).await?),
            Some(None) => None,
            None => current.category.as_ref().map(|c| c.id),
        };
        sqlx::query("UPDATE title SET name = ?, year = ?, description = ?, category_id = ? WHERE id = ?")
            .bind(payload.name.unwrap_or(current.name))
            .bind(payload.year.unwrap_or(current.year))
            .bind(payload.description.unwrap_or(current.description))
            .bind(category_id)
            .bind(id)
            .execute(&mut *transaction)
            .await?;

        if let Some(genre) = &payload.genre {
            let genre_ids = genre_ids(genre, &mut *transaction).await?;
            sqlx::query("DELETE FROM genre_title WHERE title_id = ?")
                .bind(id)
                .execute(&mut *transaction)
                .await?;
            link_genres(id, &genre_ids, &mut transaction).await?;
        }

        let title = get(id, &mut transaction).await?;
        transaction.commit().await?;
        Ok(title)
    }

    pub async fn get(&self, id: i64) -> Result<Title> {
        let mut conn = self.executor.acquire().await?;
        get(id, &mut conn).await
    }

    pub async fn list(&self, params: ListingParams, filter: &TitleFilter) -> Result<Batch<Title>> {
        let order = params.ordering(VALID_ORDER_FIELDS, DEFAULT_ORDER)?;

        let mut count_query = QueryBuilder::<ChosenDB>::new(COUNT_TITLE);
        filter.push_where(&mut count_query);
        let total: i64 = count_query
            .build_query_scalar::<i64>()
            .fetch_one(&self.executor)
            .await?;

        let mut query = QueryBuilder::<ChosenDB>::new(SELECT_TITLE);
        filter.push_where(&mut query);
        query
            .push(format!(" ORDER BY {order} LIMIT "))
            .push_bind(params.limit())
            .push(" OFFSET ")
            .push_bind(params.offset);
        let mut rows = query
            .build_query_as::<Title>()
            .fetch(&self.executor)
            .try_collect::<Vec<_>>()
            .await?;

        let mut conn = self.executor.acquire().await?;
        attach_genres(&mut rows, &mut conn).await?;

        Ok(Batch {
            offset: params.offset,
            limit: params.limit,
            total: total as u64,
            rows,
        })
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let res = sqlx::query("DELETE FROM title WHERE id = ?")
            .bind(id)
            .execute(&self.executor)
            .await?;
        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("Title".to_string()))
        } else {
            Ok(())
        }
    }

    /// Existence check for nested resources
    pub async fn exists(&self, id: i64) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM title WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.executor)
            .await?;
        Ok(found.is_some())
    }
}

async fn get(id: i64, conn: &mut sqlx::SqliteConnection) -> Result<Title> {
    let title = sqlx::query_as::<_, Title>(&format!("{SELECT_TITLE} WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::RecordNotFound("Title".to_string()))?;
    let mut titles = [title];
    attach_genres(&mut titles, conn).await?;
    let [title] = titles;
    Ok(title)
}

async fn attach_genres(titles: &mut [Title], conn: &mut sqlx::SqliteConnection) -> Result<()> {
    if titles.is_empty() {
        return Ok(());
    }
    let mut query = QueryBuilder::<ChosenDB>::new(
        "SELECT gt.title_id, g.id, g.name, g.slug FROM genre_title gt \
        JOIN genre g ON g.id = gt.genre_id WHERE gt.title_id IN (",
    );
    let mut ids = query.separated(", ");
    for title in titles.iter() {
        ids.push_bind(title.id);
    }
    query.push(") ORDER BY g.slug");

    let mut genres: HashMap<i64, Vec<Genre>> = HashMap::new();
    let rows = query
        .build_query_as::<(i64, i64, String, String)>()
        .fetch_all(&mut *conn)
        .await?;
    for (title_id, id, name, slug) in rows {
        genres
            .entry(title_id)
            .or_default()
            .push(Genre { id, name, slug });
    }
    for title in titles.iter_mut() {
        title.genre = genres.remove(&title.id).unwrap_or_default();
    }
    Ok(())
}

async fn category_id(slug: &str, conn: &mut sqlx::SqliteConnection) -> Result<i64> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM category WHERE slug = ?")
        .bind(slug)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| Error::InvalidReference {
            field: "category".to_string(),
            value: slug.to_string(),
        })
}

async fn genre_ids(slugs: &[String], conn: &mut sqlx::SqliteConnection) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM genre WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| Error::InvalidReference {
                field: "genre".to_string(),
                value: slug.to_string(),
            })?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

async fn link_genres(
    title_id: i64,
    genre_ids: &[i64],
    conn: &mut sqlx::SqliteConnection,
) -> Result<()> {
    for genre_id in genre_ids {
        sqlx::query("INSERT INTO genre_title (genre_id, title_id) VALUES (?, ?)")
            .bind(genre_id)
            .bind(title_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
