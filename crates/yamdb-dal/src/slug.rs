/// Generates entity, payload and repository for a slug identified lookup table
/// (`category`, `genre`). Records are never updated, so slugs stay stable.
#[macro_export]
macro_rules! slug_repository {
    ($entity:ident, $table:literal) => {
        use futures::TryStreamExt as _;
        use garde::Validate;
        use serde::{Deserialize, Serialize};
        use sqlx::QueryBuilder;
        use yamdb_types::general::validate_slug;

        use $crate::{error::Result, Batch, ChosenDB, Error, ListingParams};

        const VALID_ORDER_FIELDS: &[&str] = &["id", "name", "slug"];
        const DEFAULT_ORDER: &str = "slug";

        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
        pub struct $entity {
            #[serde(skip)]
            pub id: i64,
            pub name: String,
            pub slug: String,
        }

        paste::paste! {
            #[derive(Debug, Clone, Deserialize, Validate)]
            pub struct [<Create $entity>] {
                #[garde(length(chars, min = 1, max = 256))]
                pub name: String,
                #[garde(length(max = 50), custom(validate_slug))]
                pub slug: String,
            }

            pub type [<$entity Repository>] = [<$entity RepositoryImpl>]<sqlx::Pool<ChosenDB>>;

            pub struct [<$entity RepositoryImpl>]<E> {
                executor: E,
            }

            impl<'c, E> [<$entity RepositoryImpl>]<E>
            where
                for<'a> &'a E: sqlx::Executor<'c, Database = ChosenDB>,
            {
                pub fn new(executor: E) -> Self {
                    Self { executor }
                }

                pub async fn create(&self, payload: [<Create $entity>]) -> Result<$entity> {
                    let result = sqlx::query(concat!("INSERT INTO ", $table, " (name, slug) VALUES (?, ?)"))
                        .bind(&payload.name)
                        .bind(&payload.slug)
                        .execute(&self.executor)
                        .await?;
                    tracing::debug!(concat!("Created ", $table, " {}"), payload.slug);
                    Ok($entity {
                        id: result.last_insert_rowid(),
                        name: payload.name,
                        slug: payload.slug,
                    })
                }

                /// `search` is a case sensitive substring of name
                pub async fn list(&self, params: ListingParams, search: Option<&str>) -> Result<Batch<$entity>> {
                    let order = params.ordering(VALID_ORDER_FIELDS, DEFAULT_ORDER)?;

                    let mut count_query = QueryBuilder::<ChosenDB>::new(concat!("SELECT count(*) FROM ", $table));
                    let mut query = QueryBuilder::<ChosenDB>::new(concat!("SELECT id, name, slug FROM ", $table));
                    if let Some(search) = search {
                        count_query.push(" WHERE instr(name, ").push_bind(search).push(") > 0");
                        query.push(" WHERE instr(name, ").push_bind(search).push(") > 0");
                    }
                    query
                        .push(format!(" ORDER BY {order} LIMIT "))
                        .push_bind(params.limit())
                        .push(" OFFSET ")
                        .push_bind(params.offset);

                    let total: i64 = count_query
                        .build_query_scalar::<i64>()
                        .fetch_one(&self.executor)
                        .await?;
                    let rows = query
                        .build_query_as::<$entity>()
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

                pub async fn get_by_slug(&self, slug: &str) -> Result<$entity> {
                    sqlx::query_as::<_, $entity>(concat!("SELECT id, name, slug FROM ", $table, " WHERE slug = ?"))
                        .bind(slug)
                        .fetch_optional(&self.executor)
                        .await?
                        .ok_or_else(|| Error::RecordNotFound(stringify!($entity).to_string()))
                }

                pub async fn delete_by_slug(&self, slug: &str) -> Result<()> {
                    let res = sqlx::query(concat!("DELETE FROM ", $table, " WHERE slug = ?"))
                        .bind(slug)
                        .execute(&self.executor)
                        .await?;
                    if res.rows_affected() == 0 {
                        Err(Error::RecordNotFound(stringify!($entity).to_string()))
                    } else {
                        Ok(())
                    }
                }
            }
        }
    };
}
