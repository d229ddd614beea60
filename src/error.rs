use crate::schema::{ColumnarType, SchemaId};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The column cannot be laid out in a fixed binary record.
    #[error("unsupported type {ty:?} for column {column}")]
    SchemaUnsupported { column: String, ty: ColumnarType },

    #[error("expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("unknown schema: {0}")]
    UnknownSchema(SchemaId),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("value mismatch: {0}")]
    ValueMismatch(String),

    #[error("{0}")]
    Other(String),
}
