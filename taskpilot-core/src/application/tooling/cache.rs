//! Discovery snapshot cache with a fixed TTL and single-flight refresh.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

use crate::domain::ToolDescriptor;

/// One discovery result. Never mutated after capture.
#[derive(Debug)]
pub struct ToolSnapshot {
    pub tools: Vec<ToolDescriptor>,
    pub captured_at: Instant,
}

pub struct DiscoveryCache {
    ttl: Duration,
    current: RwLock<Option<Arc<ToolSnapshot>>>,
    refresh: AsyncMutex<()>,
    generation: AtomicU64,
}

impl DiscoveryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: RwLock::new(None),
            refresh: AsyncMutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Latest snapshot regardless of age.
    pub fn current(&self) -> Option<Arc<ToolSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Latest snapshot if it is still within the TTL.
    pub fn fresh(&self) -> Option<Arc<ToolSnapshot>> {
        self.current()
            .filter(|snapshot| snapshot.captured_at.elapsed() < self.ttl)
    }

    pub fn invalidate(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns a fresh snapshot, running `fetch` only when there is none or
    /// `force` is set. Concurrent callers share one in-flight refresh: a
    /// caller that waited on another refresh takes its result instead of
    /// fetching again.
    pub async fn get_or_refresh<F, Fut, E>(
        &self,
        force: bool,
        fetch: F,
    ) -> Result<(Arc<ToolSnapshot>, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<ToolDescriptor>, E>>,
    {
        if !force {
            if let Some(snapshot) = self.fresh() {
                return Ok((snapshot, false));
            }
        }

        let seen = self.generation.load(Ordering::Acquire);
        let _guard = self.refresh.lock().await;

        if self.generation.load(Ordering::Acquire) != seen {
            if let Some(snapshot) = self.current() {
                return Ok((snapshot, false));
            }
        }
        if !force {
            if let Some(snapshot) = self.fresh() {
                return Ok((snapshot, false));
            }
        }

        let tools = fetch().await?;
        let snapshot = Arc::new(ToolSnapshot {
            tools,
            captured_at: Instant::now(),
        });
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));
        self.generation.fetch_add(1, Ordering::Release);
        Ok((snapshot, true))
    }
}
