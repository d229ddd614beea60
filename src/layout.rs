use std::sync::Arc;

use tracing::{instrument, warn};

use crate::schema::{ColumnarType, SchemaId, TableSchema};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub ordinal: usize,
    pub name: String,
    pub ty: ColumnarType,
    /// Zero for dropped columns.
    pub byte_width: usize,
    pub is_by_value: bool,
    pub is_dropped: bool,
}

/// Dropped columns are never inspected for width, whatever their declared type.
pub fn extract_descriptors(schema: &TableSchema) -> Result<Vec<ColumnDescriptor>> {
    let mut out = Vec::with_capacity(schema.len());
    for (ordinal, field) in schema.fields().iter().enumerate() {
        if field.dropped {
            out.push(ColumnDescriptor {
                ordinal,
                name: field.name.clone(),
                ty: field.ty,
                byte_width: 0,
                is_by_value: false,
                is_dropped: true,
            });
            continue;
        }
        let Some(byte_width) = field.ty.fixed_width() else {
            warn!(
                schema = %schema.id(),
                column = %field.name,
                ty = ?field.ty,
                "unsupported column type"
            );
            return Err(Error::SchemaUnsupported {
                column: field.name.clone(),
                ty: field.ty,
            });
        };
        out.push(ColumnDescriptor {
            ordinal,
            name: field.name.clone(),
            ty: field.ty,
            byte_width,
            is_by_value: field.ty.is_by_value(),
            is_dropped: false,
        });
    }
    Ok(out)
}

/// Byte-offset map for one schema. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    schema_id: SchemaId,
    columns: Vec<ColumnDescriptor>,
    names: Arc<[String]>,
    offsets: Vec<Option<usize>>,
    total_size: usize,
}

impl TableLayout {
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column_names(&self) -> &Arc<[String]> {
        &self.names
    }

    /// Parallel to `columns`; `None` marks a column with no wire bytes.
    pub fn offsets(&self) -> &[Option<usize>] {
        &self.offsets
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns.len() != self.offsets.len() {
            return Err(Error::InvalidLayout(
                "columns/offsets length mismatch".to_string(),
            ));
        }
        let mut cursor = 0usize;
        for (i, (col, off)) in self.columns.iter().zip(self.offsets.iter()).enumerate() {
            if col.ordinal != i {
                return Err(Error::InvalidLayout(format!(
                    "column {} has ordinal {}",
                    i, col.ordinal
                )));
            }
            match (col.is_dropped, *off) {
                (true, None) => {}
                (true, Some(_)) => {
                    return Err(Error::InvalidLayout(format!(
                        "dropped column {} has an offset",
                        col.name
                    )));
                }
                (false, None) => {
                    return Err(Error::InvalidLayout(format!(
                        "live column {} has no offset",
                        col.name
                    )));
                }
                (false, Some(o)) => {
                    if col.ty.fixed_width() != Some(col.byte_width) {
                        return Err(Error::InvalidLayout(format!(
                            "column {} width {} does not match {:?}",
                            col.name, col.byte_width, col.ty
                        )));
                    }
                    if o != cursor {
                        return Err(Error::InvalidLayout(
                            "offsets must be tightly packed".to_string(),
                        ));
                    }
                    cursor = o
                        .checked_add(col.byte_width)
                        .ok_or_else(|| Error::InvalidLayout("size overflow".to_string()))?;
                    if cursor > self.total_size {
                        return Err(Error::InvalidLayout(format!(
                            "column {} ends past total size",
                            col.name
                        )));
                    }
                }
            }
        }
        if cursor != self.total_size {
            return Err(Error::InvalidLayout("total size mismatch".to_string()));
        }
        Ok(())
    }
}

/// Single packed pass: no padding, no reordering.
#[instrument(
    name = "layout::build",
    level = "debug",
    skip(columns),
    fields(column_count = columns.len())
)]
pub fn build_layout(schema_id: SchemaId, columns: Vec<ColumnDescriptor>) -> Result<TableLayout> {
    let mut offsets = Vec::with_capacity(columns.len());
    let mut cursor = 0usize;
    for col in &columns {
        if col.is_dropped {
            offsets.push(None);
            continue;
        }
        offsets.push(Some(cursor));
        cursor = cursor
            .checked_add(col.byte_width)
            .ok_or_else(|| Error::InvalidLayout("size overflow".to_string()))?;
    }
    let names = columns.iter().map(|c| c.name.clone()).collect();
    let layout = TableLayout {
        schema_id,
        columns,
        names,
        offsets,
        total_size: cursor,
    };
    layout.validate()?;
    Ok(layout)
}

pub fn layout_for_schema(schema: &TableSchema) -> Result<TableLayout> {
    build_layout(schema.id(), extract_descriptors(schema)?)
}
