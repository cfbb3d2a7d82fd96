//! # TaskTrack Shared Library
//!
//! Core of the TaskTrack service: accounts, sessions and privately owned
//! tasks, independent of any transport.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, session manager, ownership gate
//! - `tasks`: owner-scoped task service
//! - `store`: storage traits with PostgreSQL and in-memory backends
//! - `models`: persisted records and their SQL
//! - `db`: connection pool and migrations
//! - `error`: error classification shared by every operation

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod store;
pub mod tasks;

/// Current version of the TaskTrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
