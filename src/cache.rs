use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::Result;
use crate::catalog::{SchemaCatalog, SchemaChangeListener};
use crate::config::MapperConfig;
use crate::layout::{TableLayout, layout_for_schema};
use crate::schema::SchemaId;

#[derive(Default)]
struct CacheSlot {
    build: Mutex<()>,
    layout: RwLock<Option<Arc<TableLayout>>>,
}

impl CacheSlot {
    fn current(&self) -> Option<Arc<TableLayout>> {
        self.layout.read().clone()
    }
}

pub struct LayoutCache {
    // A slot that is no longer in the map has been invalidated; builders
    // holding it may finish but never publish through it.
    slots: DashMap<SchemaId, Arc<CacheSlot>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            slots: DashMap::with_capacity(MapperConfig::default().initial_capacity),
        }
    }

    pub fn with_config(config: &MapperConfig) -> Result<Self> {
        config.validate()?;
        let slots = match config.shard_amount {
            Some(shards) => {
                DashMap::with_capacity_and_shard_amount(config.initial_capacity, shards)
            }
            None => DashMap::with_capacity(config.initial_capacity),
        };
        Ok(Self { slots })
    }

    /// Returns the cached layout for `id`, building it from `catalog` on a miss.
    ///
    /// At most one build per key runs at a time. A build that races with
    /// [`invalidate`](Self::invalidate) is returned to its caller but not cached,
    /// and a failed build leaves nothing behind.
    pub fn get_or_build<C>(&self, id: SchemaId, catalog: &C) -> Result<Arc<TableLayout>>
    where
        C: SchemaCatalog + ?Sized,
    {
        loop {
            let slot = self.slot(id);
            if let Some(layout) = slot.current() {
                trace!(schema = %id, "layout cache hit");
                return Ok(layout);
            }

            let _build = slot.build.lock();
            if let Some(layout) = slot.current() {
                trace!(schema = %id, "layout built by another caller");
                return Ok(layout);
            }
            if !self.holds(id, &slot) {
                continue;
            }

            trace!(schema = %id, "layout cache miss");
            let built = catalog
                .resolve(id)
                .and_then(|schema| layout_for_schema(&schema));
            let layout = match built {
                Ok(layout) => Arc::new(layout),
                Err(e) => {
                    self.slots.remove_if(&id, |_, s| Arc::ptr_eq(s, &slot));
                    return Err(e);
                }
            };

            match self.slots.get(&id) {
                Some(entry) if Arc::ptr_eq(entry.value(), &slot) => {
                    *slot.layout.write() = Some(Arc::clone(&layout));
                    debug!(schema = %id, total_size = layout.total_size(), "layout cached");
                }
                _ => debug!(schema = %id, "schema changed during build, layout not cached"),
            }
            return Ok(layout);
        }
    }

    /// Drops the cached layout for `id`. Unknown ids are ignored.
    pub fn invalidate(&self, id: SchemaId) {
        if self.slots.remove(&id).is_some() {
            debug!(schema = %id, "layout invalidated");
        }
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    pub fn is_cached(&self, id: SchemaId) -> bool {
        self.slots
            .get(&id)
            .is_some_and(|s| s.layout.read().is_some())
    }

    /// Number of schemas with a valid cached layout.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|e| e.value().layout.read().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, id: SchemaId) -> Arc<CacheSlot> {
        if let Some(slot) = self.slots.get(&id) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.slots.entry(id).or_default().value())
    }

    fn holds(&self, id: SchemaId, slot: &Arc<CacheSlot>) -> bool {
        self.slots
            .get(&id)
            .is_some_and(|s| Arc::ptr_eq(s.value(), slot))
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaChangeListener for LayoutCache {
    fn on_schema_changed(&self, id: SchemaId) {
        self.invalidate(id);
    }
}
