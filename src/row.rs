use std::sync::Arc;

use uuid::Uuid;

use crate::layout::TableLayout;
use crate::schema::ColumnarType;

/// A decoded wire value, already in host byte order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Uuid([u8; 16]),
    TimestampTzMicros(i64),
}

impl Value {
    pub fn ty(&self) -> ColumnarType {
        match self {
            Value::Bool(_) => ColumnarType::Bool,
            Value::I16(_) => ColumnarType::I16,
            Value::I32(_) => ColumnarType::I32,
            Value::I64(_) => ColumnarType::I64,
            Value::F32(_) => ColumnarType::F32,
            Value::F64(_) => ColumnarType::F64,
            Value::Uuid(_) => ColumnarType::Uuid,
            Value::TimestampTzMicros(_) => ColumnarType::TimestampTzMicros,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedRow {
    pub values: Vec<Option<Value>>,
}

impl DecodedRow {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Uuid(Uuid),
    TimestampTz(i64),
}

impl From<Value> for Datum {
    fn from(v: Value) -> Self {
        match v {
            Value::Bool(b) => Datum::Bool(b),
            Value::I16(x) => Datum::Int16(x),
            Value::I32(x) => Datum::Int32(x),
            Value::I64(x) => Datum::Int64(x),
            Value::F32(x) => Datum::Float32(x),
            Value::F64(x) => Datum::Float64(x),
            Value::Uuid(b) => Datum::Uuid(Uuid::from_bytes(b)),
            Value::TimestampTzMicros(x) => Datum::TimestampTz(x),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    datums: Vec<Datum>,
}

impl Row {
    pub fn datums(&self) -> &[Datum] {
        &self.datums
    }

    pub fn into_datums(self) -> Vec<Datum> {
        self.datums
    }

    pub fn get(&self, ordinal: usize) -> Option<&Datum> {
        self.datums.get(ordinal)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Datum> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.datums.get(idx)
    }

    pub fn is_null(&self, ordinal: usize) -> bool {
        matches!(self.datums.get(ordinal), Some(Datum::Null))
    }

    pub fn len(&self) -> usize {
        self.datums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datums.is_empty()
    }
}

/// Maps a decoded row onto host datums in schema order.
///
/// # Panics
///
/// If the row shape or any value type disagrees with `layout`. The decoder only
/// produces rows from the same layout, so a disagreement is a bug, not bad input.
pub fn assemble(layout: &TableLayout, decoded: &DecodedRow) -> Row {
    assert_eq!(
        decoded.len(),
        layout.len(),
        "decoded row has {} slots, layout has {} columns",
        decoded.len(),
        layout.len()
    );
    let mut datums = Vec::with_capacity(decoded.len());
    for (col, value) in layout.columns().iter().zip(decoded.values.iter()) {
        match *value {
            None => {
                assert!(col.is_dropped, "live column {} decoded as null", col.name);
                datums.push(Datum::Null);
            }
            Some(v) => {
                assert!(!col.is_dropped, "dropped column {} carries a value", col.name);
                assert_eq!(v.ty(), col.ty, "column {} type mismatch", col.name);
                datums.push(Datum::from(v));
            }
        }
    }
    Row {
        columns: Arc::clone(layout.column_names()),
        datums,
    }
}
