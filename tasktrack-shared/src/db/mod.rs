/// Database plumbing for the PostgreSQL backend
///
/// - `pool`: connection pool creation, health checks, occupancy stats
/// - `migrations`: embedded schema migrations
///
/// Queries live on the models in [`crate::models`]; the storage traits they
/// back are in [`crate::store`].

pub mod migrations;
pub mod pool;
