use core::fmt;

use crate::{Error, Result};

/// Host identifier of a table schema.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub u32);

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColumnarType {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    Uuid,
    TimestampTzMicros,
    Utf8,
    Bytes,
    JsonbText,
}

impl ColumnarType {
    /// Width on the wire, or `None` for variable-length types.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ColumnarType::Bool => Some(1),
            ColumnarType::I16 => Some(2),
            ColumnarType::I32 | ColumnarType::F32 => Some(4),
            ColumnarType::I64 | ColumnarType::F64 | ColumnarType::TimestampTzMicros => Some(8),
            ColumnarType::Uuid => Some(16),
            ColumnarType::Utf8 | ColumnarType::Bytes | ColumnarType::JsonbText => None,
        }
    }

    pub fn is_by_value(self) -> bool {
        matches!(self.fixed_width(), Some(w) if w <= 8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnarField {
    pub name: String,
    pub ty: ColumnarType,
    pub dropped: bool,
}

impl ColumnarField {
    pub fn new(name: impl Into<String>, ty: ColumnarType) -> Self {
        Self {
            name: name.into(),
            ty,
            dropped: false,
        }
    }

    pub fn dropped(name: impl Into<String>, ty: ColumnarType) -> Self {
        Self {
            name: name.into(),
            ty,
            dropped: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    id: SchemaId,
    fields: Vec<ColumnarField>,
}

impl TableSchema {
    pub fn new(id: SchemaId, fields: Vec<ColumnarField>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::Other(
                "table schema must have at least one field".to_string(),
            ));
        }
        Ok(Self { id, fields })
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn fields(&self) -> &[ColumnarField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Tombstones the named column, keeping its ordinal position.
    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| !f.dropped && f.name == name)
            .ok_or_else(|| Error::Other(format!("no live column named {name}")))?;
        field.dropped = true;
        Ok(())
    }
}
