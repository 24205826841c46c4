//! Chunked CRM contact exports for the Versandtool mailing service.

pub mod api;
pub mod config;
pub mod db_migration;
pub mod domains;
pub mod errors;
pub mod globals;

#[cfg(test)]
mod test_support;

use errors::DbResult;

/// Connect the global database pool, optionally applying the bundled migrations.
/// Must run before the entry points in [`api`].
pub async fn initialize(database_url: &str, migrate: bool) -> DbResult<()> {
    globals::initialize(database_url).await?;
    if migrate {
        db_migration::initialize_database().await?;
    }
    Ok(())
}
