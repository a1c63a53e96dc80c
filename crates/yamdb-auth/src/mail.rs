use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};
use tracing::{debug, info};
use yamdb_types::config::ReviewsConfig;

use crate::{code::ConfirmationCode, error::Result, Error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

impl Message {
    fn check_headers(&self) -> Result<()> {
        let has_line_break = |s: &str| s.contains(['\r', '\n']);
        if has_line_break(&self.subject)
            || has_line_break(&self.from)
            || self.to.iter().any(|a| has_line_break(a))
        {
            return Err(Error::InvalidMessage("line break in header"));
        }
        if self.to.is_empty() {
            return Err(Error::InvalidMessage("no recipients"));
        }
        Ok(())
    }
}

/// Confirmation email template
#[derive(Debug, Clone)]
pub struct MailTemplate {
    pub from: String,
    pub subject: String,
    pub body: String,
}

impl MailTemplate {
    pub fn confirmation(&self, username: &str, email: &str, code: &ConfirmationCode) -> Message {
        let body = self
            .body
            .replace("{username}", username)
            .replace("{confirmation_code}", code.as_ref());
        Message {
            subject: self.subject.clone(),
            body,
            from: self.from.clone(),
            to: vec![email.to_string()],
        }
    }
}

impl From<&ReviewsConfig> for MailTemplate {
    fn from(config: &ReviewsConfig) -> Self {
        MailTemplate {
            from: config.mail_from.clone(),
            subject: config.mail_subject.clone(),
            body: config.mail_body.clone(),
        }
    }
}

/// Delivers messages synchronously from the caller's point of view, any
/// failure is reported back and not retried
///
/// Registration sends inside the open SQLite write transaction, so other
/// writers wait (up to the pool busy timeout) until `send` returns.
/// Implementations must be fast or hand the message off to a queue.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> Result<()>;
}

/// Writes each message into its own file in a directory
pub struct FileMailer {
    dir: PathBuf,
}

impl FileMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileMailer { dir: dir.into() }
    }

    fn render(message: &Message, now: OffsetDateTime, id: &str) -> String {
        let date = now
            .format(&Rfc2822)
            .unwrap_or_else(|_| now.unix_timestamp().to_string());
        format!(
            "Content-Type: text/plain; charset=\"utf-8\"\r\n\
             Subject: {}\r\n\
             From: {}\r\n\
             To: {}\r\n\
             Date: {}\r\n\
             Message-ID: <{}@yamdb>\r\n\
             \r\n\
             {}\r\n",
            message.subject,
            message.from,
            message.to.join(", "),
            date,
            id,
            message.body
        )
    }
}

#[async_trait]
impl Mailer for FileMailer {
    async fn send(&self, message: Message) -> Result<()> {
        message.check_headers()?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let now = OffsetDateTime::now_utc();
        let id = uuid::Uuid::new_v4().simple().to_string();
        let path = self.dir.join(format!("{}-{}.eml", now.unix_timestamp(), id));
        tokio::fs::write(&path, Self::render(&message, now, &id)).await?;
        info!(
            "Mail \"{}\" to {:?} stored in {}",
            message.subject,
            message.to,
            path.display()
        );
        Ok(())
    }
}

/// Only logs messages, for development
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: Message) -> Result<()> {
        message.check_headers()?;
        info!("Mail \"{}\" to {:?}", message.subject, message.to);
        debug!("Mail body:\n{}", message.body);
        Ok(())
    }
}

/// Keeps sent messages in memory
#[derive(Clone, Default)]
pub struct MemoryMailer {
    outbox: Arc<Mutex<Vec<Message>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: Message) -> Result<()> {
        message.check_headers()?;
        self.outbox
            .lock()
            .map_err(|_| Error::InvalidMessage("outbox poisoned"))?
            .push(message);
        Ok(())
    }
}
