//! Service layer for the gate log.
//! - Keeps business rules out of the HTTP layer.
//! - Reuses validation and entity definitions in the `models` crate.
//! - Outbound integrations (mail, image host) sit behind traits so tests run offline.

pub mod errors;
pub mod pagination;
pub mod auth;
pub mod visitors;
pub mod feed;
pub mod notify;
pub mod media;
#[cfg(test)]
pub mod test_support;
