//! Parsed pack indexes, shared between every load
//!
//! One [`PackIndex`] is kept per pack hash until [`PackIndexCache::invalidate`]
//! or [`PackIndexCache::clear`] drops it; nothing is evicted otherwise. The
//! first caller to ask for a pack parses it while concurrent callers for the
//! same pack wait on that parse instead of repeating it. A failed parse is not
//! remembered, so the next access tries again.

use crate::artifacts::pack::pack_index::PackIndex;
use crate::errors::{OdbError, OdbResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, trace};

type Slot = Arc<OnceCell<Arc<PackIndex>>>;

#[derive(Debug, Default)]
pub struct PackIndexCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl PackIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, pack: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(pack.to_string()).or_default().clone()
    }

    /// The cached index for `pack`, running `parse` if there is none yet
    pub async fn get_or_parse<F, Fut>(&self, pack: &str, parse: F) -> OdbResult<Arc<PackIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = OdbResult<PackIndex>>,
    {
        let slot = self.slot(pack);
        if let Some(index) = slot.get() {
            trace!(pack, "pack index cache hit");
            return Ok(index.clone());
        }

        let index = slot
            .get_or_try_init(|| async move {
                let index = parse().await?;
                debug!(pack, objects = index.len(), "parsed pack index");
                Ok::<_, OdbError>(Arc::new(index))
            })
            .await?;

        Ok(index.clone())
    }

    /// Forget the index of one pack, e.g. after it was rewritten on disk
    pub fn invalidate(&self, pack: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.remove(pack).is_some() {
            debug!(pack, "invalidated pack index");
        }
    }

    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.clear();
        debug!("cleared pack index cache");
    }

    /// Whether a parsed index for `pack` is currently held
    pub fn contains(&self, pack: &str) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(pack).is_some_and(|slot| slot.initialized())
    }
}
