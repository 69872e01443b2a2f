//! PostgreSQL connect options and pool construction.
//!
//! Options are built field by field from the descriptor instead of through a
//! URL, so passwords never pass through string formatting.

use crate::models::ConnectionDescriptor;
use crate::{Result, error::SqlWardenError};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

/// Builds driver connect options from a descriptor.
///
/// # Errors
/// Returns a configuration error for an unknown `ssl_mode`; valid values are
/// `disable`, `allow`, `prefer`, `require`, `verify-ca` and `verify-full`.
pub fn connect_options(descriptor: &ConnectionDescriptor) -> Result<PgConnectOptions> {
    let mut options = PgConnectOptions::new()
        .host(&descriptor.host)
        .port(descriptor.port)
        .database(&descriptor.database)
        .username(&descriptor.username)
        .password(descriptor.password())
        .application_name(concat!("sqlwarden-", env!("CARGO_PKG_VERSION")));

    if let Some(mode) = descriptor.ssl_mode.as_deref() {
        let ssl_mode: PgSslMode = mode.parse().map_err(|_| {
            SqlWardenError::configuration(format!("Invalid PostgreSQL ssl_mode '{}'", mode))
        })?;
        options = options.ssl_mode(ssl_mode);
    }

    Ok(options)
}

/// Creates the connection pool and performs the first handshake.
///
/// # Pool Configuration
/// - Max connections: `descriptor.pool_size`
/// - Acquire timeout: `descriptor.connect_timeout`
/// - Connections are health-checked before use
/// - Every session runs in UTC so timestamps serialize consistently
pub(super) async fn create_pool(descriptor: &ConnectionDescriptor) -> Result<PgPool> {
    use sqlx::Executor;

    let options = connect_options(descriptor)?;

    tracing::debug!(
        "Creating PostgreSQL pool for {} (max {} connections)",
        descriptor,
        descriptor.pool_size
    );

    PgPoolOptions::new()
        .max_connections(descriptor.pool_size)
        .acquire_timeout(descriptor.connect_timeout)
        .test_before_acquire(true)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET timezone = 'UTC'").await?;
                Ok(())
            })
        })
        .connect_with(options)
        .await
        .map_err(SqlWardenError::connection_failed)
}
