//! Session store implementations for FitCoach.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemorySessionStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSessionStore;

use std::sync::Arc;
use fitcoach_config::{SessionBackend, SessionConfig};
use fitcoach_core::error::SessionError;
use fitcoach_core::session::SessionStore;

/// Open the session store selected in configuration.
///
/// `ephemeral` forces the in-memory store regardless of the backend setting.
pub async fn open(config: &SessionConfig, ephemeral: bool) -> Result<Arc<dyn SessionStore>, SessionError> {
    if ephemeral {
        return Ok(Arc::new(InMemorySessionStore::new()));
    }
    match config.backend {
        SessionBackend::Memory => Ok(Arc::new(InMemorySessionStore::new())),
        #[cfg(feature = "sqlite")]
        SessionBackend::Sqlite => Ok(Arc::new(SqliteSessionStore::new(&config.db_url).await?)),
        #[cfg(not(feature = "sqlite"))]
        SessionBackend::Sqlite => Err(SessionError::Storage(
            "built without the sqlite feature".into(),
        )),
    }
}
