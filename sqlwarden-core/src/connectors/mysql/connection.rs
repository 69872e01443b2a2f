//! MySQL connect options and pool construction.

use crate::models::ConnectionDescriptor;
use crate::{Result, error::SqlWardenError};
use sqlx::MySqlPool;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlSslMode};

/// Builds driver connect options from a descriptor.
///
/// # Errors
/// Returns a configuration error for an unknown `ssl_mode`; valid values are
/// `disabled`, `preferred`, `required`, `verify_ca` and `verify_identity`.
pub fn connect_options(descriptor: &ConnectionDescriptor) -> Result<MySqlConnectOptions> {
    let mut options = MySqlConnectOptions::new()
        .host(&descriptor.host)
        .port(descriptor.port)
        .database(&descriptor.database)
        .username(&descriptor.username)
        .password(descriptor.password())
        .charset("utf8mb4")
        .timezone(Some(String::from("+00:00")));

    if let Some(mode) = descriptor.ssl_mode.as_deref() {
        let ssl_mode: MySqlSslMode = mode.replace('-', "_").parse().map_err(|_| {
            SqlWardenError::configuration(format!("Invalid MySQL ssl_mode '{}'", mode))
        })?;
        options = options.ssl_mode(ssl_mode);
    }

    Ok(options)
}

/// Creates the connection pool and performs the first handshake.
pub(super) async fn create_pool(descriptor: &ConnectionDescriptor) -> Result<MySqlPool> {
    let options = connect_options(descriptor)?;

    tracing::debug!(
        "Creating MySQL pool for {} (max {} connections)",
        descriptor,
        descriptor.pool_size
    );

    MySqlPoolOptions::new()
        .max_connections(descriptor.pool_size)
        .acquire_timeout(descriptor.connect_timeout)
        .test_before_acquire(true)
        .connect_with(options)
        .await
        .map_err(SqlWardenError::connection_failed)
}
