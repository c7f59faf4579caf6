use thiserror::Error;

pub mod types;
pub mod utils;
pub mod env;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown visitor status: {0}")]
    UnknownStatus(String),
}
