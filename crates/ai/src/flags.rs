//! Feature flag gate.
//!
//! Flags are read through an injected [`FlagSource`] and cached per key for
//! `ttl`. A flag flip made through [`FeatureFlagGate::set_flag`] is visible to
//! the writing process immediately; other processes see it once their cached
//! entry expires, so `ttl` is the documented upper bound on staleness.
//!
//! Fail-closed: a missing record, an invalid key or a source error all read as
//! disabled. Source errors are never cached.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use homefix_core::ActorId;

use crate::registry::CapabilityGroup;

pub const DEFAULT_FLAG_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlag {
    pub flag_key: String,
    pub enabled: bool,
    pub updated_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagSourceError {
    #[error("invalid flag key: {0}")]
    InvalidKey(String),

    #[error("flag store unavailable: {0}")]
    Unavailable(String),
}

/// Backing store for flag records.
#[async_trait]
pub trait FlagSource: Send + Sync {
    async fn fetch(&self, flag_key: &str) -> Result<Option<FeatureFlag>, FlagSourceError>;

    async fn upsert(
        &self,
        flag_key: &str,
        enabled: bool,
        updated_by: &ActorId,
    ) -> Result<FeatureFlag, FlagSourceError>;

    async fn list(&self) -> Result<Vec<FeatureFlag>, FlagSourceError>;
}

/// Flag keys are lowercase snake case: `[a-z0-9_]+`, at most 64 chars.
pub fn validate_flag_key(flag_key: &str) -> Result<(), FlagSourceError> {
    let ok = !flag_key.is_empty()
        && flag_key.len() <= 64
        && flag_key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(FlagSourceError::InvalidKey(flag_key.to_string()))
    }
}

/// In-memory flag source for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryFlagSource {
    inner: RwLock<HashMap<String, FeatureFlag>>,
}

impl InMemoryFlagSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with `(key, enabled)` pairs, attributed to the system actor.
    pub fn with_flags<'a>(flags: impl IntoIterator<Item = (&'a str, bool)>) -> Self {
        let now = Utc::now();
        let map = flags
            .into_iter()
            .map(|(key, enabled)| {
                (
                    key.to_string(),
                    FeatureFlag {
                        flag_key: key.to_string(),
                        enabled,
                        updated_by: Some(ActorId::SYSTEM.to_string()),
                        updated_at: now,
                    },
                )
            })
            .collect();
        Self {
            inner: RwLock::new(map),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl FlagSource for InMemoryFlagSource {
    async fn fetch(&self, flag_key: &str) -> Result<Option<FeatureFlag>, FlagSourceError> {
        let map = self
            .inner
            .read()
            .map_err(|_| FlagSourceError::Unavailable("flag map lock poisoned".to_string()))?;
        Ok(map.get(flag_key).cloned())
    }

    async fn upsert(
        &self,
        flag_key: &str,
        enabled: bool,
        updated_by: &ActorId,
    ) -> Result<FeatureFlag, FlagSourceError> {
        validate_flag_key(flag_key)?;
        let flag = FeatureFlag {
            flag_key: flag_key.to_string(),
            enabled,
            updated_by: Some(updated_by.to_string()),
            updated_at: Utc::now(),
        };
        let mut map = self
            .inner
            .write()
            .map_err(|_| FlagSourceError::Unavailable("flag map lock poisoned".to_string()))?;
        map.insert(flag_key.to_string(), flag.clone());
        Ok(flag)
    }

    async fn list(&self) -> Result<Vec<FeatureFlag>, FlagSourceError> {
        let map = self
            .inner
            .read()
            .map_err(|_| FlagSourceError::Unavailable("flag map lock poisoned".to_string()))?;
        let mut flags: Vec<_> = map.values().cloned().collect();
        flags.sort_by(|a, b| a.flag_key.cmp(&b.flag_key));
        Ok(flags)
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedFlag {
    enabled: bool,
    fetched_at: Instant,
}

/// Process-wide, read-mostly flag cache in front of a [`FlagSource`].
pub struct FeatureFlagGate {
    source: Arc<dyn FlagSource>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedFlag>>,
}

impl FeatureFlagGate {
    pub fn new(source: Arc<dyn FlagSource>) -> Self {
        Self::with_ttl(source, DEFAULT_FLAG_TTL)
    }

    pub fn with_ttl(source: Arc<dyn FlagSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Gate backed by a fresh in-memory source; every flag starts disabled.
    pub fn in_memory() -> Self {
        Self::new(InMemoryFlagSource::arc())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn is_feature_enabled(&self, flag_key: &str) -> bool {
        if let Err(e) = validate_flag_key(flag_key) {
            warn!(flag_key, error = %e, "rejecting flag lookup");
            return false;
        }

        if let Some(enabled) = self.cached(flag_key) {
            return enabled;
        }

        match self.source.fetch(flag_key).await {
            Ok(record) => {
                let enabled = record.is_some_and(|f| f.enabled);
                self.store(flag_key, enabled);
                debug!(flag_key, enabled, "flag refreshed");
                enabled
            }
            Err(e) => {
                warn!(flag_key, error = %e, "flag lookup failed; treating as disabled");
                false
            }
        }
    }

    pub async fn is_capability_enabled(&self, capability: CapabilityGroup) -> bool {
        self.is_feature_enabled(capability.flag_key()).await
    }

    /// Admin write: persist through the source, then drop the cached value.
    pub async fn set_flag(
        &self,
        flag_key: &str,
        enabled: bool,
        actor: &ActorId,
    ) -> Result<FeatureFlag, FlagSourceError> {
        validate_flag_key(flag_key)?;
        let flag = self.source.upsert(flag_key, enabled, actor).await?;
        self.invalidate(flag_key);
        info!(flag_key, enabled, actor = %actor, "feature flag updated");
        Ok(flag)
    }

    pub async fn list_flags(&self) -> Result<Vec<FeatureFlag>, FlagSourceError> {
        self.source.list().await
    }

    pub fn invalidate(&self, flag_key: &str) {
        if let Ok(mut cache) = self.cache.write() {
            cache.remove(flag_key);
        }
    }

    pub fn invalidate_all(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    fn cached(&self, flag_key: &str) -> Option<bool> {
        let cache = self.cache.read().ok()?;
        let entry = cache.get(flag_key)?;
        (entry.fetched_at.elapsed() < self.ttl).then_some(entry.enabled)
    }

    fn store(&self, flag_key: &str, enabled: bool) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(
                flag_key.to_string(),
                CachedFlag {
                    enabled,
                    fetched_at: Instant::now(),
                },
            );
        }
    }
}

impl core::fmt::Debug for FeatureFlagGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FeatureFlagGate")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
