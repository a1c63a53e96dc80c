pub mod access;
pub mod claim;
pub mod config;
pub mod general;

pub use access::{Access, Caller, Denial, Identity, Policy};
pub use claim::Role;
