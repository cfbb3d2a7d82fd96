/// Middleware modules for the API server
///
/// - `security`: security response headers
/// - `session`: session token extraction, cookies, and the gate middleware

pub mod security;
pub mod session;
