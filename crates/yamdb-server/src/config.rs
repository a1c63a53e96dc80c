use std::{path::PathBuf, time::Duration};

pub use clap::Parser;
use yamdb_app::state::AppConfig;
use yamdb_types::config::{BackendConfig, ReviewsConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MailBackend {
    /// One file per message in the mail directory
    File,
    /// Messages only logged
    Log,
}

#[derive(Debug, Clone, clap::Parser)]
#[command(version, about = "YaMDb - reviews of books, films and music, REST API server")]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "YAMDB_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,

    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "YAMDB_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[command(flatten)]
    pub backend: BackendConfig,

    #[arg(
        long,
        env = "YAMDB_TOKEN_VALIDITY",
        default_value = "1 day",
        help = "Access token validity in human friendly format (e.g. 1d, 12h, 30m - or combined)",
        value_parser = humantime::parse_duration
    )]
    pub token_validity: Duration,

    #[arg(
        long,
        env = "YAMDB_DEFAULT_PAGE_SIZE",
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..=1000),
        help = "Page size used when request does not specify one"
    )]
    pub default_page_size: u32,

    #[arg(long, env = "YAMDB_CORS", help = "Enable permissive CORS")]
    pub cors: bool,

    #[arg(
        long,
        value_enum,
        env = "YAMDB_MAIL_BACKEND",
        default_value = "file",
        help = "Where confirmation emails go"
    )]
    pub mail_backend: MailBackend,

    #[arg(
        long,
        env = "YAMDB_MAIL_DIR",
        help = "Directory for the file mail backend, default is [data-dir]/sent_emails"
    )]
    mail_dir: Option<PathBuf>,

    #[command(flatten)]
    pub reviews: ReviewsConfig,
}

impl ServerConfig {
    pub fn data_dir(&self) -> PathBuf {
        self.backend.data_dir()
    }

    pub fn database_url(&self) -> String {
        self.backend.database_url()
    }

    pub fn mail_dir(&self) -> PathBuf {
        self.mail_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("sent_emails"))
    }
}

impl From<&ServerConfig> for AppConfig {
    fn from(config: &ServerConfig) -> Self {
        AppConfig {
            default_page_size: config.default_page_size,
            reviews: config.reviews.clone(),
        }
    }
}
