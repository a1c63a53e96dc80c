pub mod code;
pub mod error;
pub mod mail;
pub mod token;

pub use error::{Error, Result};
