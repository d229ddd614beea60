use std::sync::Arc;

use tracing::trace;

use crate::Result;
use crate::cache::LayoutCache;
use crate::catalog::{SchemaCatalog, SchemaChangeListener};
use crate::codec::fixed_be::decode_fixed_be_into;
use crate::config::MapperConfig;
use crate::layout::TableLayout;
use crate::row::{DecodedRow, Row, assemble};
use crate::schema::SchemaId;

pub struct BinaryMapper {
    catalog: Arc<dyn SchemaCatalog>,
    cache: Arc<LayoutCache>,
}

impl BinaryMapper {
    /// Creates the layout cache and subscribes it to `catalog` change events.
    pub fn new(catalog: Arc<dyn SchemaCatalog>, config: MapperConfig) -> Result<Self> {
        let cache = Arc::new(LayoutCache::with_config(&config)?);
        let listener: Arc<dyn SchemaChangeListener> = cache.clone();
        catalog.subscribe(Arc::downgrade(&listener));
        Ok(Self { catalog, cache })
    }

    pub fn decode(&self, id: SchemaId, payload: &[u8]) -> Result<Row> {
        let mut decoded = DecodedRow::default();
        self.decode_into_row_buffer(id, payload, &mut decoded)
    }

    /// Like [`decode`](Self::decode), reusing `buf` for the intermediate row.
    pub fn decode_into_row_buffer(
        &self,
        id: SchemaId,
        payload: &[u8],
        buf: &mut DecodedRow,
    ) -> Result<Row> {
        let layout = self.layout(id)?;
        decode_fixed_be_into(&layout, payload, buf)?;
        trace!(schema = %id, bytes = payload.len(), "payload decoded");
        Ok(assemble(&layout, buf))
    }

    pub fn layout(&self, id: SchemaId) -> Result<Arc<TableLayout>> {
        self.cache.get_or_build(id, self.catalog.as_ref())
    }

    pub fn invalidate(&self, id: SchemaId) {
        self.cache.invalidate(id);
    }

    pub fn cache(&self) -> &LayoutCache {
        &self.cache
    }
}
