use crate::layout::{ColumnDescriptor, TableLayout};
use crate::row::{DecodedRow, Value};
use crate::schema::ColumnarType;
use crate::{Error, Result};

#[inline]
fn read_array<const N: usize>(payload: &[u8], offset: usize) -> Result<[u8; N]> {
    let end = offset
        .checked_add(N)
        .ok_or_else(|| Error::InvalidLayout("field offset overflow".to_string()))?;
    payload
        .get(offset..end)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| Error::InvalidLayout("field out of bounds".to_string()))
}

#[inline]
fn decode_column(col: &ColumnDescriptor, payload: &[u8], offset: usize) -> Result<Value> {
    let value = match col.ty {
        ColumnarType::Bool => Value::Bool(read_array::<1>(payload, offset)?[0] != 0),
        ColumnarType::I16 => Value::I16(i16::from_be_bytes(read_array(payload, offset)?)),
        ColumnarType::I32 => Value::I32(i32::from_be_bytes(read_array(payload, offset)?)),
        ColumnarType::I64 => Value::I64(i64::from_be_bytes(read_array(payload, offset)?)),
        ColumnarType::TimestampTzMicros => {
            Value::TimestampTzMicros(i64::from_be_bytes(read_array(payload, offset)?))
        }
        ColumnarType::F32 => {
            Value::F32(f32::from_bits(u32::from_be_bytes(read_array(payload, offset)?)))
        }
        ColumnarType::F64 => {
            Value::F64(f64::from_bits(u64::from_be_bytes(read_array(payload, offset)?)))
        }
        // Opaque block: copied as-is, never byte-swapped.
        ColumnarType::Uuid => Value::Uuid(read_array::<16>(payload, offset)?),
        // TableLayout::validate rejects live columns without a fixed width.
        ColumnarType::Utf8 | ColumnarType::Bytes | ColumnarType::JsonbText => {
            unreachable!("variable-length column {} in a validated layout", col.name)
        }
    };
    Ok(value)
}

pub fn decode_fixed_be(layout: &TableLayout, payload: &[u8]) -> Result<DecodedRow> {
    let mut row = DecodedRow {
        values: Vec::with_capacity(layout.len()),
    };
    decode_fixed_be_into(layout, payload, &mut row)?;
    Ok(row)
}

/// Decodes into `out`, reusing its allocation. On error `out` is left empty.
pub fn decode_fixed_be_into(
    layout: &TableLayout,
    payload: &[u8],
    out: &mut DecodedRow,
) -> Result<()> {
    out.values.clear();
    if payload.len() != layout.total_size() {
        return Err(Error::SizeMismatch {
            expected: layout.total_size(),
            actual: payload.len(),
        });
    }
    out.values.reserve(layout.len());
    for (col, offset) in layout.columns().iter().zip(layout.offsets().iter()) {
        match offset {
            None => out.values.push(None),
            Some(offset) => match decode_column(col, payload, *offset) {
                Ok(v) => out.values.push(Some(v)),
                Err(e) => {
                    out.values.clear();
                    return Err(e);
                }
            },
        }
    }
    Ok(())
}

/// `values` is parallel to the layout's columns: `Some` for live, `None` for dropped.
pub fn encode_fixed_be_into(
    layout: &TableLayout,
    values: &[Option<Value>],
    out: &mut Vec<u8>,
) -> Result<()> {
    if values.len() != layout.len() {
        return Err(Error::ValueMismatch(format!(
            "expected {} values, got {}",
            layout.len(),
            values.len()
        )));
    }
    let start = out.len();
    out.reserve(layout.total_size());
    for (col, value) in layout.columns().iter().zip(values.iter()) {
        let v = match (col.is_dropped, value) {
            (true, None) => continue,
            (true, Some(_)) => {
                out.truncate(start);
                return Err(Error::ValueMismatch(format!(
                    "dropped column {} must not carry a value",
                    col.name
                )));
            }
            (false, None) => {
                out.truncate(start);
                return Err(Error::ValueMismatch(format!("column {} is mandatory", col.name)));
            }
            (false, Some(v)) => v,
        };
        if v.ty() != col.ty {
            out.truncate(start);
            return Err(Error::ValueMismatch(format!(
                "column {} expects {:?}, got {:?}",
                col.name,
                col.ty,
                v.ty()
            )));
        }
        match *v {
            Value::Bool(b) => out.push(b as u8),
            Value::I16(x) => out.extend_from_slice(&x.to_be_bytes()),
            Value::I32(x) => out.extend_from_slice(&x.to_be_bytes()),
            Value::I64(x) | Value::TimestampTzMicros(x) => {
                out.extend_from_slice(&x.to_be_bytes())
            }
            Value::F32(x) => out.extend_from_slice(&x.to_bits().to_be_bytes()),
            Value::F64(x) => out.extend_from_slice(&x.to_bits().to_be_bytes()),
            Value::Uuid(b) => out.extend_from_slice(&b),
        }
    }
    debug_assert_eq!(out.len() - start, layout.total_size());
    Ok(())
}
