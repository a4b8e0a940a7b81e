//! PostgreSQL client with connection pooling.
//!
//! This module provides the connection layer the page source runs on:
//! validated pool configuration, a deadpool-managed diesel-async pool, and a
//! connection wrapper. No migration machinery lives here; batchfeed reads
//! existing tables and owns no schema.

mod pg_client;
mod pg_config;

use deadpool::managed::{Object, Pool};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
pub use pg_client::{PgClient, PgConn, PgPoolStatus};
pub use pg_config::PgConfig;

/// Type alias for the connection pool used throughout the crate.
pub type ConnectionPool = Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

/// Type alias for a connection object from the pool.
pub type PooledConnection = Object<AsyncDieselConnectionManager<AsyncPgConnection>>;
