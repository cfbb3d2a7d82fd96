/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Register, login, logout
/// - `tasks`: Owner-scoped task CRUD

pub mod auth;
pub mod health;
pub mod tasks;
