use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::client::storage::{KeyValueStore, StorageError};

pub const AGE_GATE_KEY: &str = "aminos_age_ruo_confirmed";
pub const AGE_GATE_EXPIRY_KEY: &str = "aminos_age_ruo_expiry";

/// Research-use / age confirmation, remembered for 30 days.
pub struct AgeGate {
    storage: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl AgeGate {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            ttl: Duration::days(30),
        }
    }

    /// Expired or corrupt confirmations are cleared and count as unconfirmed.
    pub fn is_confirmed(&self, now: DateTime<Utc>) -> bool {
        let flag = self.storage.get(AGE_GATE_KEY).ok().flatten();
        let expiry = self
            .storage
            .get(AGE_GATE_EXPIRY_KEY)
            .ok()
            .flatten()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc));

        match (flag.as_deref(), expiry) {
            (Some("true"), Some(expiry)) if expiry > now => true,
            (None, None) => false,
            _ => {
                if let Err(err) = self.reset() {
                    tracing::warn!(error = %err, "failed to clear stale age confirmation");
                }
                false
            }
        }
    }

    pub fn confirm(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, StorageError> {
        let expiry = now + self.ttl;
        self.storage.set(AGE_GATE_KEY, "true")?;
        self.storage.set(AGE_GATE_EXPIRY_KEY, &expiry.to_rfc3339())?;
        Ok(expiry)
    }

    pub fn reset(&self) -> Result<(), StorageError> {
        self.storage.remove(AGE_GATE_KEY)?;
        self.storage.remove(AGE_GATE_EXPIRY_KEY)
    }
}
