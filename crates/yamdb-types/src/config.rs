use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct BackendConfig {
    #[arg(
        long,
        env = "YAMDB_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/yamdb.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "YAMDB_DATA_DIR",
        help = "Data directory (database, token secret, sent emails), default is system default like ~/.local/share/yamdb"
    )]
    data_dir: Option<PathBuf>,
}

impl BackendConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|p| p.join("yamdb"))
                .unwrap_or_else(|| PathBuf::from("yamdb"))
        })
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/yamdb.db", self.data_dir().display()))
    }
}

/// Settings for registration and content validation
#[derive(Debug, Clone, Args)]
pub struct ReviewsConfig {
    #[arg(
        long,
        env = "YAMDB_MIN_YEAR",
        default_value_t = 1,
        allow_negative_numbers = true,
        help = "Earliest accepted year of a title, the latest is the current year"
    )]
    pub min_year: i32,

    #[arg(
        long,
        env = "YAMDB_MAIL_FROM",
        default_value = "noreply@yamdb.local",
        help = "Sender address of confirmation emails"
    )]
    pub mail_from: String,

    #[arg(
        long,
        env = "YAMDB_MAIL_SUBJECT",
        default_value = "YaMDb confirmation code",
        help = "Subject of confirmation emails"
    )]
    pub mail_subject: String,

    #[arg(
        long,
        env = "YAMDB_MAIL_BODY",
        default_value = "Hello {username},\n\nyour confirmation code is {confirmation_code}\n",
        help = "Body of confirmation emails, {username} and {confirmation_code} are replaced"
    )]
    pub mail_body: String,
}
