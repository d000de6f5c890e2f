//! Time-boxed cache of subscription lookups.
//!
//! Owned by the router state rather than living in a global, so each server
//! (and each test) gets its own cache.

use std::time::Duration;

use moka::sync::Cache;
use uuid::Uuid;

use crate::models::SubscriptionStatus;

/// Default time a cached status stays valid.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Subscription statuses keyed by profile id, expiring `ttl` after insert.
#[derive(Clone, Debug)]
pub struct SubscriptionCache {
    inner: Cache<Uuid, SubscriptionStatus>,
}

impl SubscriptionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Cached status for a profile, if still fresh.
    pub fn get(&self, profile_id: Uuid) -> Option<SubscriptionStatus> {
        self.inner.get(&profile_id)
    }

    pub fn insert(&self, profile_id: Uuid, status: SubscriptionStatus) {
        self.inner.insert(profile_id, status);
    }

    /// Forget a profile's status so the next lookup hits the database.
    pub fn invalidate(&self, profile_id: Uuid) {
        self.inner.invalidate(&profile_id);
    }
}

impl Default for SubscriptionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
