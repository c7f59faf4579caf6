//! Visitor log: scoped queries, approval workflow, offline replay and reports.

pub mod domain;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::VisitorService;
