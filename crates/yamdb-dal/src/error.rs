pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Field name reported for violations spanning more columns
pub const NON_FIELD: &str = "non_field_errors";

pub const DUPLICATE_EMAIL: &str = "A user with that email already exists.";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Unique constraint violated on {field}: {message}")]
    UniqueViolation { field: String, message: String },

    #[error("Invalid reference in {field}: {value}")]
    InvalidReference { field: String, value: String },

    #[error("Invalid confirmation code")]
    InvalidConfirmationCode,

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),

    #[error("Notification failed: {0}")]
    NotificationFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let (field, message) = unique_violation(db.message());
                Error::UniqueViolation {
                    field: field.to_string(),
                    message: message.to_string(),
                }
            }
            _ => Error::DatabaseError(e),
        }
    }
}

/// SQLite reports `UNIQUE constraint failed: table.column[, table.column]`
fn unique_violation(db_message: &str) -> (&'static str, &'static str) {
    let columns = db_message
        .rsplit_once(':')
        .map(|(_, c)| c.trim())
        .unwrap_or_default();
    match columns {
        "users.username" => ("username", "A user with that username already exists."),
        "users.email" => ("email", DUPLICATE_EMAIL),
        "category.slug" => ("slug", "category with this slug already exists."),
        "genre.slug" => ("slug", "genre with this slug already exists."),
        "review.title_id, review.author_id" => {
            (NON_FIELD, "You have already reviewed this title.")
        }
        _ => (NON_FIELD, "Record already exists."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_message() {
        assert_eq!(
            "email",
            unique_violation("UNIQUE constraint failed: users.email").0
        );
        assert_eq!(
            NON_FIELD,
            unique_violation("UNIQUE constraint failed: review.title_id, review.author_id").0
        );
        assert_eq!(NON_FIELD, unique_violation("garbage").0);
    }
}
