use std::net::IpAddr;

use async_trait::async_trait;
use pfdns_database::{
    DatabasePool,
    rusqlite::{OptionalExtension, params},
};

use super::{AddressFamily, DeviceBindingStore, DeviceId, LookupError, RegistrationStatus};

const IP4LOG_QUERY: &str = "SELECT mac FROM ip4log WHERE ip = ?1";
const IP6LOG_QUERY: &str = "SELECT mac FROM ip6log WHERE ip = ?1";
const NODE_QUERY: &str = "SELECT status FROM node WHERE mac = ?1";

/// Device bindings read from the `ip4log`, `ip6log` and `node` tables.
#[derive(Clone)]
pub struct SqliteBindingStore {
    db: DatabasePool,
}

impl SqliteBindingStore {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }

    /// Run a single-column lookup on a pooled connection.
    async fn lookup(&self, sql: &'static str, key: String) -> Result<String, LookupError> {
        let value = self
            .db
            .interact(move |c| {
                let mut stmt = c.prepare_cached(sql)?;
                stmt.query_row(params![key], |row| row.get::<_, String>(0))
                    .optional()
            })
            .await?;

        value.ok_or(LookupError::NotFound)
    }
}

#[async_trait]
impl DeviceBindingStore for SqliteBindingStore {
    async fn lookup_device_id(&self, address: IpAddr) -> Result<DeviceId, LookupError> {
        let address = address.to_canonical();
        let sql = match AddressFamily::of(address) {
            AddressFamily::V4 => IP4LOG_QUERY,
            AddressFamily::V6 => IP6LOG_QUERY,
        };
        self.lookup(sql, address.to_string()).await
    }

    async fn lookup_status(&self, device_id: &str) -> Result<RegistrationStatus, LookupError> {
        let status = self.lookup(NODE_QUERY, device_id.to_owned()).await?;
        Ok(RegistrationStatus::from_db(&status))
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod sqlite_tests;
