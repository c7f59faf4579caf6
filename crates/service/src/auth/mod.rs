//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration with email verification, login and JWT issuing/decoding live here;
//! the HTTP layer only translates requests and errors.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::{AuthService, AuthSettings};
