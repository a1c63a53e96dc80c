use jsonwebtoken::errors::Error as JwtError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("JWT error: {0}")]
    JwtError(#[from] JwtError),
    #[error("Mail delivery error: {0}")]
    MailError(#[from] std::io::Error),
    #[error("Invalid mail message: {0}")]
    InvalidMessage(&'static str),
}
