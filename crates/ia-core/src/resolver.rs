//! Group identity resolution.
//!
//! Built-in targets resolve locally. Directory groups are looked up once per
//! run and cached by id; concurrent misses for the same id share one lookup.

use crate::error::ResolveError;
use crate::model::{AssignmentTarget, GroupIdentity, TargetKind};
use async_trait::async_trait;
use ia_connectors::http::ResponseCache;
use ia_connectors::GroupSource;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Cached entries outlive any realistic run.
const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Resolves assignment targets to group identities.
#[async_trait]
pub trait GroupResolver: Send + Sync {
    async fn resolve(&self, target: &AssignmentTarget) -> Result<GroupIdentity, ResolveError>;
}

/// Resolver settings.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Bound on a single group lookup, including any throttling wait in the
    /// HTTP client. Keep it above `MAX_RETRY_AFTER`.
    pub lookup_timeout: Duration,
    /// Maximum number of cached groups.
    pub cache_capacity: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(30),
            cache_capacity: 50_000,
        }
    }
}

/// Resolver backed by a group source and an id-keyed cache.
pub struct CachingGroupResolver {
    source: Arc<dyn GroupSource>,
    cache: ResponseCache<GroupIdentity>,
    lookup_timeout: Duration,
    lookups: AtomicUsize,
}

impl CachingGroupResolver {
    pub fn new(source: Arc<dyn GroupSource>, config: &ResolverConfig) -> Self {
        Self {
            source,
            cache: ResponseCache::new(CACHE_TTL, config.cache_capacity),
            lookup_timeout: config.lookup_timeout,
            lookups: AtomicUsize::new(0),
        }
    }

    /// Number of lookups issued against the group source so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of groups currently cached.
    pub async fn cached_groups(&self) -> u64 {
        self.cache.entry_count().await
    }

    async fn lookup(&self, group_id: &str) -> Result<GroupIdentity, ResolveError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        debug!(group_id, "Looking up directory group");

        match tokio::time::timeout(self.lookup_timeout, self.source.fetch_group(group_id)).await {
            Ok(Ok(group)) => Ok(GroupIdentity {
                id: Some(group_id.to_string()),
                display_name: group.display_name.unwrap_or_default(),
            }),
            Ok(Err(source)) => Err(ResolveError::Lookup {
                group_id: group_id.to_string(),
                source,
            }),
            Err(_) => Err(ResolveError::Timeout {
                group_id: group_id.to_string(),
                timeout: self.lookup_timeout,
            }),
        }
    }
}

#[async_trait]
impl GroupResolver for CachingGroupResolver {
    #[instrument(level = "debug", skip(self))]
    async fn resolve(&self, target: &AssignmentTarget) -> Result<GroupIdentity, ResolveError> {
        match &target.kind {
            TargetKind::AllDevices => Ok(GroupIdentity::all_devices()),
            TargetKind::AllUsers => Ok(GroupIdentity::all_users()),
            TargetKind::ExclusionGroup | TargetKind::InclusionGroup | TargetKind::Other(_) => {
                let group_id = target
                    .group_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| ResolveError::MissingGroupId {
                        discriminator: target.kind.odata_type().to_string(),
                    })?;

                self.cache
                    .get_or_try_insert_with(group_id.to_string(), self.lookup(group_id))
                    .await
            }
        }
    }
}
