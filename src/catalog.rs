use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::schema::{SchemaId, TableSchema};
use crate::{Error, Result};

pub trait SchemaChangeListener: Send + Sync {
    fn on_schema_changed(&self, id: SchemaId);
}

pub trait SchemaCatalog: Send + Sync {
    fn resolve(&self, id: SchemaId) -> Result<Arc<TableSchema>>;

    /// Registers a listener. Listeners that have been dropped are skipped.
    fn subscribe(&self, listener: Weak<dyn SchemaChangeListener>);
}

#[derive(Default)]
pub struct InMemoryCatalog {
    schemas: RwLock<HashMap<SchemaId, Arc<TableSchema>>>,
    listeners: Mutex<Vec<Weak<dyn SchemaChangeListener>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, schema: TableSchema) {
        let id = schema.id();
        self.schemas.write().insert(id, Arc::new(schema));
        self.notify(id);
    }

    /// Applies `f` to a copy of the schema and publishes the result.
    pub fn alter<F>(&self, id: SchemaId, f: F) -> Result<()>
    where
        F: FnOnce(&mut TableSchema) -> Result<()>,
    {
        {
            let mut schemas = self.schemas.write();
            let current = schemas.get(&id).ok_or(Error::UnknownSchema(id))?;
            let mut next = TableSchema::clone(current);
            f(&mut next)?;
            if next.id() != id {
                return Err(Error::Other("schema id cannot change".to_string()));
            }
            schemas.insert(id, Arc::new(next));
        }
        self.notify(id);
        Ok(())
    }

    pub fn drop_schema(&self, id: SchemaId) -> Result<()> {
        self.schemas
            .write()
            .remove(&id)
            .ok_or(Error::UnknownSchema(id))?;
        self.notify(id);
        Ok(())
    }

    fn notify(&self, id: SchemaId) {
        let live: Vec<Arc<dyn SchemaChangeListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        debug!(schema = %id, listeners = live.len(), "schema changed");
        for listener in live {
            listener.on_schema_changed(id);
        }
    }
}

impl SchemaCatalog for InMemoryCatalog {
    fn resolve(&self, id: SchemaId) -> Result<Arc<TableSchema>> {
        self.schemas
            .read()
            .get(&id)
            .cloned()
            .ok_or(Error::UnknownSchema(id))
    }

    fn subscribe(&self, listener: Weak<dyn SchemaChangeListener>) {
        self.listeners.lock().push(listener);
    }
}
