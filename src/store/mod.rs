// Store layer — generic data access against the hosted backend.
//
// The feed core never talks to a concrete backend; everything goes through
// the Store trait. Backend selection follows configuration: a postgres://
// DATABASE_URL picks the direct-database backend (when compiled in),
// otherwise TIMBER_API_URL picks the hosted data API.

pub mod memory;
pub mod models;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod rest;
pub mod traits;

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;

pub use models::{Engagement, Log, LogQuery, Profile};
pub use traits::Store;

/// Open the store the configuration points at.
pub async fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    if let Some(url) = &config.database_url {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            #[cfg(feature = "postgres")]
            {
                let store = postgres::PgStore::connect(url).await?;
                return Ok(Arc::new(store));
            }
            #[cfg(not(feature = "postgres"))]
            anyhow::bail!(
                "DATABASE_URL points at PostgreSQL but timber was built without \
                 the `postgres` feature. Rebuild with --features postgres, or \
                 unset DATABASE_URL to use the data API."
            );
        }
    }

    match &config.api_url {
        Some(api_url) => {
            let store = rest::RestStore::new(api_url, config.api_key.as_deref())?;
            Ok(Arc::new(store))
        }
        None => anyhow::bail!(
            "No backend configured. Set TIMBER_API_URL (hosted data API) or \
             DATABASE_URL (direct PostgreSQL) in your .env file.\n\
             See .env.example for the required variables."
        ),
    }
}
