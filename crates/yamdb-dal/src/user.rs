use std::future::Future;

use futures::TryStreamExt as _;
use garde::Validate;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire as _, QueryBuilder};
use tracing::debug;
use yamdb_types::{
    access::Identity,
    claim::Role,
    general::{validate_username, ValidEmail},
};

use crate::{error::Result, Batch, ChosenDB, Error, ListingParams};

const VALID_ORDER_FIELDS: &[&str] = &["id", "username", "email", "role", "date_joined"];
const DEFAULT_ORDER: &str = "username, id";
const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, bio, role, is_active, is_superuser";

fn is_valid_role(role: &str, _ctx: &()) -> garde::Result {
    role.parse::<Role>()
        .map_err(|e| garde::Error::new(e.to_string()))
        .map(|_| ())
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    #[serde(skip)]
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[serde(skip)]
    pub is_active: bool,
    #[serde(skip)]
    pub is_superuser: bool,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            is_superuser: self.is_superuser,
        }
    }
}

/// Pending account to be inserted
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        NewUser {
            username: username.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role: Role::default(),
            is_superuser: false,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// User created by an administrator
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[garde(custom(validate_username))]
    pub username: String,
    #[garde(dive)]
    pub email: ValidEmail,
    #[serde(default)]
    #[garde(length(chars, max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[garde(length(chars, max = 150))]
    pub last_name: String,
    #[serde(default)]
    #[garde(skip)]
    pub bio: String,
    #[garde(inner(custom(is_valid_role)))]
    pub role: Option<String>,
}

impl From<CreateUser> for NewUser {
    fn from(value: CreateUser) -> Self {
        NewUser {
            username: value.username,
            email: value.email.into(),
            first_name: value.first_name,
            last_name: value.last_name,
            bio: value.bio,
            role: value
                .role
                .and_then(|r| r.parse().ok())
                .unwrap_or_default(),
            is_superuser: false,
        }
    }
}

/// Partial update, absent fields are kept
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[garde(inner(custom(validate_username)))]
    pub username: Option<String>,
    #[garde(dive)]
    pub email: Option<ValidEmail>,
    #[garde(inner(length(chars, max = 150)))]
    pub first_name: Option<String>,
    #[garde(inner(length(chars, max = 150)))]
    pub last_name: Option<String>,
    #[garde(skip)]
    pub bio: Option<String>,
    #[garde(inner(custom(is_valid_role)))]
    pub role: Option<String>,
}

impl UpdateUser {
    /// Own profile can not change role
    pub fn without_role(mut self) -> Self {
        self.role = None;
        self
    }
}

pub type UserRepository = UserRepositoryImpl<sqlx::Pool<ChosenDB>>;

pub struct UserRepositoryImpl<E> {
    executor: E,
}

impl<'c, E> UserRepositoryImpl<E>
where
    for<'a> &'a E:
        sqlx::Executor<'c, Database = ChosenDB> + sqlx::Acquire<'c, Database = ChosenDB>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Inserts a pending user with the confirmation code and calls `notify`
    /// before committing, so a failed notification leaves no user behind.
    pub async fn register<F, Fut, N>(&self, new_user: NewUser, code: &str, notify: F) -> Result<User>
    where
        F: FnOnce(User) -> Fut,
        Fut: Future<Output = std::result::Result<(), N>>,
        N: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let result = sqlx::query(
            "INSERT INTO users (username, email, first_name, last_name, bio, role, confirm_code, is_active, is_superuser, date_joined)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.bio)
        .bind(new_user.role.as_str())
        .bind(code)
        .bind(new_user.is_superuser)
        .bind(crate::now())
        .execute(&mut *transaction)
        .await?;
        let user = get(result.last_insert_rowid(), &mut *transaction).await?;

        notify(user.clone())
            .await
            .map_err(|e| Error::NotificationFailed(e.into()))?;
        transaction.commit().await?;
        debug!("Registered pending user {}", user.username);
        Ok(user)
    }

    /// Activates a pending user, the code is cleared so it can be used only once
    pub async fn activate(&self, username: &str, code: &str) -> Result<User> {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let result = sqlx::query(
            "UPDATE users SET is_active = 1, confirm_code = NULL
            WHERE username = ? AND confirm_code = ? AND is_active = 0",
        )
        .bind(username)
        .bind(code)
        .execute(&mut *transaction)
        .await?;

        let user = get_by_username(username, &mut *transaction).await?;
        if result.rows_affected() == 0 {
            debug!("Confirmation code for {username} does not match");
            return Err(Error::InvalidConfirmationCode);
        }
        transaction.commit().await?;
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        get(id, &self.executor).await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.executor)
            .await?;
        Ok(found.is_some())
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        get_by_username(username, &self.executor).await
    }

    /// `search` matches username exactly
    pub async fn list(&self, params: ListingParams, search: Option<&str>) -> Result<Batch<User>> {
        let order = params.ordering(VALID_ORDER_FIELDS, DEFAULT_ORDER)?;

        let mut count_query = QueryBuilder::<ChosenDB>::new("SELECT count(*) FROM users");
        let mut query = QueryBuilder::<ChosenDB>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        if let Some(search) = search {
            count_query.push(" WHERE username = ").push_bind(search);
            query.push(" WHERE username = ").push_bind(search);
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
            .build_query_as::<User>()
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

    pub async fn update(&self, username: &str, payload: UpdateUser) -> Result<User> {
        let mut conn = self.executor.acquire().await?;
        let mut transaction = conn.begin().await?;
        let current = get_by_username(username, &mut *transaction).await?;
        let role = match payload.role {
            Some(role) => role
                .parse::<Role>()
                .map_err(|e| Error::InvalidReference {
                    field: "role".into(),
                    value: e.0,
                })?,
            None => current.role,
        };

        sqlx::query(
            "UPDATE users SET username = ?, email = ?, first_name = ?, last_name = ?, bio = ?, role = ?
            WHERE id = ?",
        )
        .bind(payload.username.unwrap_or(current.username))
        .bind(payload.email.map(String::from).unwrap_or(current.email))
        .bind(payload.first_name.unwrap_or(current.first_name))
        .bind(payload.last_name.unwrap_or(current.last_name))
        .bind(payload.bio.unwrap_or(current.bio))
        .bind(role.as_str())
        .bind(current.id)
        .execute(&mut *transaction)
        .await?;

        let user = get(current.id, &mut *transaction).await?;
        transaction.commit().await?;
        Ok(user)
    }

    pub async fn delete_by_username(&self, username: &str) -> Result<()> {
        let res = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.executor)
            .await?;
        if res.rows_affected() == 0 {
            Err(Error::RecordNotFound("User".to_string()))
        } else {
            Ok(())
        }
    }
}

async fn get<'c, E>(id: i64, executor: E) -> Result<User>
where
    E: sqlx::Executor<'c, Database = ChosenDB>,
{
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::RecordNotFound("User".to_string()))
}

async fn get_by_username<'c, E>(username: &str, executor: E) -> Result<User>
where
    E: sqlx::Executor<'c, Database = ChosenDB>,
{
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
    ))
    .bind(username)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| Error::RecordNotFound("User".to_string()))
}
