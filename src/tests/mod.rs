mod test_cache;

use crate::schema::{ColumnarField, ColumnarType, SchemaId, TableSchema};

pub(crate) const SENSOR: SchemaId = SchemaId(16384);

/// int32, int64, float32, uuid: 32 bytes on the wire.
pub(crate) fn sensor_schema() -> TableSchema {
    TableSchema::new(
        SENSOR,
        vec![
            ColumnarField::new("sensor_id", ColumnarType::I32),
            ColumnarField::new("ts_ms", ColumnarType::I64),
            ColumnarField::new("reading", ColumnarType::F32),
            ColumnarField::new("device", ColumnarType::Uuid),
        ],
    )
    .unwrap()
}

pub(crate) fn sensor_payload() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&[0x00, 0x00, 0x00, 0x01]);
    out.extend_from_slice(&1_700_000_000_000i64.to_be_bytes());
    out.extend_from_slice(&[0x41, 0xBC, 0x00, 0x00]); // 23.5f32
    out.extend(0u8..16);
    out
}
