use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Weak};
use std::thread;

use crate::cache::LayoutCache;
use crate::catalog::{InMemoryCatalog, SchemaCatalog, SchemaChangeListener};
use crate::codec::fixed_be::decode_fixed_be;
use crate::config::MapperConfig;
use crate::row::Value;
use crate::schema::{ColumnarField, ColumnarType, SchemaId, TableSchema};
use crate::tests::{SENSOR, sensor_payload, sensor_schema};
use crate::{Error, Result};

/// Counts how many times a schema is resolved, i.e. how many builds ran.
#[derive(Default)]
struct CountingCatalog {
    inner: InMemoryCatalog,
    resolves: AtomicUsize,
}

impl SchemaCatalog for CountingCatalog {
    fn resolve(&self, id: SchemaId) -> Result<Arc<TableSchema>> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(id)
    }

    fn subscribe(&self, listener: Weak<dyn SchemaChangeListener>) {
        self.inner.subscribe(listener);
    }
}

/// Invalidates the cache from inside the first resolve, as a concurrent schema change would.
struct RacingCatalog {
    inner: InMemoryCatalog,
    cache: Arc<LayoutCache>,
    fired: AtomicBool,
}

impl SchemaCatalog for RacingCatalog {
    fn resolve(&self, id: SchemaId) -> Result<Arc<TableSchema>> {
        let schema = self.inner.resolve(id)?;
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.cache.invalidate(id);
        }
        Ok(schema)
    }

    fn subscribe(&self, listener: Weak<dyn SchemaChangeListener>) {
        self.inner.subscribe(listener);
    }
}

#[test]
fn repeated_lookups_return_the_same_layout() {
    let catalog = CountingCatalog::default();
    catalog.inner.register(sensor_schema());
    let cache = LayoutCache::new();

    let a = cache.get_or_build(SENSOR, &catalog).unwrap();
    let b = cache.get_or_build(SENSOR, &catalog).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.offsets(), b.offsets());
    assert_eq!(a.total_size(), b.total_size());
    assert_eq!(catalog.resolves.load(Ordering::SeqCst), 1);
    assert!(cache.is_cached(SENSOR));
    assert_eq!(cache.len(), 1);
}

#[test]
fn concurrent_first_lookups_build_once() {
    let catalog = CountingCatalog::default();
    catalog.inner.register(sensor_schema());
    let cache = LayoutCache::new();
    let threads = 16;
    let barrier = Barrier::new(threads);

    let (barrier, cache_ref, catalog_ref) = (&barrier, &cache, &catalog);
    let layouts: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(move || {
                    barrier.wait();
                    cache_ref.get_or_build(SENSOR, catalog_ref).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(catalog.resolves.load(Ordering::SeqCst), 1);
    for layout in &layouts[1..] {
        assert!(Arc::ptr_eq(&layouts[0], layout));
    }
}

#[test]
fn invalidate_forces_rebuild_against_new_schema() {
    let catalog = CountingCatalog::default();
    catalog.inner.register(sensor_schema());
    let cache = LayoutCache::new();

    let old = cache.get_or_build(SENSOR, &catalog).unwrap();
    catalog
        .inner
        .alter(SENSOR, |s| {
            *s = TableSchema::new(
                SENSOR,
                vec![
                    ColumnarField::new("sensor_id", ColumnarType::I64),
                    ColumnarField::new("ts_ms", ColumnarType::I64),
                    ColumnarField::new("reading", ColumnarType::F32),
                    ColumnarField::new("device", ColumnarType::Uuid),
                ],
            )?;
            Ok(())
        })
        .unwrap();

    // Not subscribed yet: the stale entry is still served.
    assert!(Arc::ptr_eq(&old, &cache.get_or_build(SENSOR, &catalog).unwrap()));

    cache.invalidate(SENSOR);
    assert!(!cache.is_cached(SENSOR));
    let new = cache.get_or_build(SENSOR, &catalog).unwrap();
    assert_eq!(new.total_size(), 36);
    assert_eq!(new.offsets(), &[Some(0), Some(8), Some(16), Some(20)]);

    // A decode holding the old layout still completes against it.
    let row = decode_fixed_be(&old, &sensor_payload()).unwrap();
    assert_eq!(row.values[0], Some(Value::I32(1)));
    assert_eq!(catalog.resolves.load(Ordering::SeqCst), 2);
}

#[test]
fn subscribed_cache_invalidates_on_catalog_change() {
    let catalog = InMemoryCatalog::new();
    catalog.register(sensor_schema());
    let cache = Arc::new(LayoutCache::new());
    let listener: Arc<dyn SchemaChangeListener> = cache.clone();
    catalog.subscribe(Arc::downgrade(&listener));

    cache.get_or_build(SENSOR, &catalog).unwrap();
    assert!(cache.is_cached(SENSOR));

    catalog.alter(SENSOR, |s| s.drop_column("reading")).unwrap();
    assert!(!cache.is_cached(SENSOR));

    let layout = cache.get_or_build(SENSOR, &catalog).unwrap();
    assert_eq!(layout.offsets(), &[Some(0), Some(4), None, Some(12)]);
    assert_eq!(layout.total_size(), 28);
}

#[test]
fn invalidating_unknown_schema_is_a_no_op() {
    let cache = LayoutCache::new();
    cache.invalidate(SchemaId(42));
    cache.clear();
    assert!(cache.is_empty());
    assert!(!cache.is_cached(SchemaId(42)));
}

#[test]
fn unsupported_schema_is_never_cached() {
    let catalog = CountingCatalog::default();
    catalog.inner.register(
        TableSchema::new(
            SchemaId(20),
            vec![
                ColumnarField::new("id", ColumnarType::I32),
                ColumnarField::new("body", ColumnarType::JsonbText),
            ],
        )
        .unwrap(),
    );
    let cache = LayoutCache::new();
    let expected = Error::SchemaUnsupported {
        column: "body".to_string(),
        ty: ColumnarType::JsonbText,
    };

    for _ in 0..3 {
        let err = cache.get_or_build(SchemaId(20), &catalog).unwrap_err();
        assert_eq!(err, expected);
        assert!(!cache.is_cached(SchemaId(20)));
    }
    assert_eq!(catalog.resolves.load(Ordering::SeqCst), 3);

    catalog
        .inner
        .alter(SchemaId(20), |s| s.drop_column("body"))
        .unwrap();
    cache.invalidate(SchemaId(20));
    let layout = cache.get_or_build(SchemaId(20), &catalog).unwrap();
    assert_eq!(layout.total_size(), 4);
}

#[test]
fn unknown_schema_error_propagates() {
    let catalog = InMemoryCatalog::new();
    let cache = LayoutCache::new();
    let err = cache.get_or_build(SchemaId(99), &catalog).unwrap_err();
    assert_eq!(err, Error::UnknownSchema(SchemaId(99)));
    assert!(cache.is_empty());
    assert_eq!(cache.slot_count(), 0);
}

#[test]
fn failed_builds_leave_no_slots() {
    let catalog = InMemoryCatalog::new();
    catalog.register(
        TableSchema::new(
            SchemaId(21),
            vec![ColumnarField::new("body", ColumnarType::Bytes)],
        )
        .unwrap(),
    );
    let cache = LayoutCache::new();
    for i in 0..10_000 {
        assert!(cache.get_or_build(SchemaId(100_000 + i), &catalog).is_err());
    }
    assert!(cache.get_or_build(SchemaId(21), &catalog).is_err());
    assert_eq!(cache.slot_count(), 0);
}

#[test]
fn invalidate_drop_and_clear_release_slots() {
    let catalog = InMemoryCatalog::new();
    catalog.register(sensor_schema());
    catalog.register(
        TableSchema::new(
            SchemaId(31),
            vec![ColumnarField::new("x", ColumnarType::I16)],
        )
        .unwrap(),
    );
    let cache = Arc::new(LayoutCache::new());
    let listener: Arc<dyn SchemaChangeListener> = cache.clone();
    catalog.subscribe(Arc::downgrade(&listener));

    cache.get_or_build(SENSOR, &catalog).unwrap();
    cache.get_or_build(SchemaId(31), &catalog).unwrap();
    assert_eq!(cache.slot_count(), 2);

    catalog.drop_schema(SchemaId(31)).unwrap();
    assert_eq!(cache.slot_count(), 1);
    assert_eq!(
        cache.get_or_build(SchemaId(31), &catalog).unwrap_err(),
        Error::UnknownSchema(SchemaId(31))
    );
    assert_eq!(cache.slot_count(), 1);

    cache.invalidate(SENSOR);
    assert_eq!(cache.slot_count(), 0);

    cache.get_or_build(SENSOR, &catalog).unwrap();
    cache.clear();
    assert_eq!(cache.slot_count(), 0);
    assert!(cache.is_empty());
}

#[test]
fn with_config_rejects_bad_shard_amount() {
    let config = MapperConfig {
        shard_amount: Some(3),
        ..MapperConfig::default()
    };
    let err = LayoutCache::with_config(&config).err().unwrap();
    assert_eq!(
        err,
        Error::Other("shard_amount must be a power of two greater than one".to_string())
    );

    let config = MapperConfig {
        shard_amount: Some(8),
        ..MapperConfig::default()
    };
    let cache = LayoutCache::with_config(&config).unwrap();
    assert!(cache.is_empty());
}

#[test]
fn build_racing_an_invalidation_is_not_cached() {
    let cache = Arc::new(LayoutCache::new());
    let catalog = RacingCatalog {
        inner: InMemoryCatalog::new(),
        cache: Arc::clone(&cache),
        fired: AtomicBool::new(false),
    };
    catalog.inner.register(sensor_schema());

    let first = cache.get_or_build(SENSOR, &catalog).unwrap();
    assert_eq!(first.total_size(), 32);
    assert!(!cache.is_cached(SENSOR));

    let second = cache.get_or_build(SENSOR, &catalog).unwrap();
    assert!(cache.is_cached(SENSOR));
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn clear_drops_every_entry() {
    let catalog = InMemoryCatalog::new();
    catalog.register(sensor_schema());
    catalog.register(
        TableSchema::new(
            SchemaId(30),
            vec![ColumnarField::new("x", ColumnarType::I16)],
        )
        .unwrap(),
    );
    let cache = LayoutCache::new();
    cache.get_or_build(SENSOR, &catalog).unwrap();
    cache.get_or_build(SchemaId(30), &catalog).unwrap();
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn concurrent_decodes_survive_invalidation() {
    let catalog = InMemoryCatalog::new();
    catalog.register(sensor_schema());
    let cache = LayoutCache::new();
    let payload = sensor_payload();

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..500 {
                    let layout = cache.get_or_build(SENSOR, &catalog).unwrap();
                    let row = decode_fixed_be(&layout, &payload).unwrap();
                    assert_eq!(row.values[1], Some(Value::I64(1_700_000_000_000)));
                }
            });
        }
        s.spawn(|| {
            for _ in 0..500 {
                cache.invalidate(SENSOR);
            }
        });
    });
    assert_eq!(cache.get_or_build(SENSOR, &catalog).unwrap().total_size(), 32);
}
