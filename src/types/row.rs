//! The record codec: a row serialized as a length-prefixed, self-describing
//! payload.
//!
//! Layout:
//!
//! ```text
//! u8 num_cols
//! u8 type_code[num_cols]     // serial type codes; TEXT = 0x0C + len
//! u8 data[...]               // per-column fixed/variable bytes in order
//! ```

use serde::{Deserialize, Serialize};

use crate::types::bytes;
use crate::types::error::{DatabaseError, Result};
use crate::types::value::ColumnValue;
use crate::types::{MAX_TEXT_LENGTH, NULL_PAGE_NO};

const SERIAL_NULL: u8 = 0x00;
const SERIAL_TINYINT: u8 = 0x01;
const SERIAL_SMALLINT: u8 = 0x02;
const SERIAL_INT: u8 = 0x03;
const SERIAL_BIGINT: u8 = 0x04;
const SERIAL_FLOAT: u8 = 0x05;
const SERIAL_YEAR: u8 = 0x06;
const SERIAL_TIME: u8 = 0x08;
const SERIAL_DATETIME: u8 = 0x0A;
const SERIAL_DATE: u8 = 0x0B;
const SERIAL_TEXT: u8 = 0x0C;

fn corrupt(reason: impl Into<String>) -> DatabaseError {
    DatabaseError::PageCorruption {
        page_no: NULL_PAGE_NO,
        reason: reason.into(),
    }
}

fn serial_code(value: &ColumnValue) -> Result<u8> {
    match value {
        ColumnValue::Null => Ok(SERIAL_NULL),
        ColumnValue::TinyInt(_) => Ok(SERIAL_TINYINT),
        ColumnValue::SmallInt(_) => Ok(SERIAL_SMALLINT),
        ColumnValue::Int(_) => Ok(SERIAL_INT),
        ColumnValue::BigInt(_) => Ok(SERIAL_BIGINT),
        ColumnValue::Float(_) => Ok(SERIAL_FLOAT),
        ColumnValue::Year(_) => Ok(SERIAL_YEAR),
        ColumnValue::Time(_) => Ok(SERIAL_TIME),
        ColumnValue::DateTime(_) => Ok(SERIAL_DATETIME),
        ColumnValue::Date(_) => Ok(SERIAL_DATE),
        ColumnValue::Text(s) => {
            if s.len() > MAX_TEXT_LENGTH {
                return Err(DatabaseError::TextTooLong { length: s.len() });
            }
            Ok(SERIAL_TEXT + s.len() as u8)
        }
    }
}

/// One row's values, in column-definition order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowData {
    pub values: Vec<ColumnValue>,
}

impl RowData {
    pub fn new(values: Vec<ColumnValue>) -> Self {
        Self { values }
    }

    /// Total payload length: the column count byte, one type code per
    /// column, and each value's data bytes.
    pub fn payload_length(&self) -> usize {
        1 + self.values.len() + self.values.iter().map(ColumnValue::width).sum::<usize>()
    }

    /// Encode into `buf`, which must be exactly `payload_length()` bytes.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), self.payload_length());
        buf[0] = self.values.len() as u8;
        for (i, value) in self.values.iter().enumerate() {
            buf[1 + i] = serial_code(value)?;
        }
        let mut cursor = 1 + self.values.len();
        for value in &self.values {
            match value {
                ColumnValue::Null => {}
                ColumnValue::TinyInt(v) => bytes::write_i8(buf, cursor, *v),
                ColumnValue::SmallInt(v) => bytes::write_i16(buf, cursor, *v),
                ColumnValue::Int(v) => bytes::write_i32(buf, cursor, *v),
                ColumnValue::BigInt(v) => bytes::write_i64(buf, cursor, *v),
                ColumnValue::Float(v) => bytes::write_f64(buf, cursor, *v),
                ColumnValue::Year(v) => bytes::write_i8(buf, cursor, *v),
                ColumnValue::Time(v) => bytes::write_i32(buf, cursor, *v),
                ColumnValue::DateTime(v) => bytes::write_u64(buf, cursor, *v),
                ColumnValue::Date(v) => bytes::write_u64(buf, cursor, *v),
                ColumnValue::Text(s) => {
                    buf[cursor..cursor + s.len()].copy_from_slice(s.as_bytes());
                }
            }
            cursor += value.width();
        }
        Ok(())
    }

    /// Decode a payload slice back into values.
    pub fn decode(data: &[u8]) -> Result<RowData> {
        if data.is_empty() {
            return Err(corrupt("empty record payload"));
        }
        let num_cols = data[0] as usize;
        if 1 + num_cols > data.len() {
            return Err(corrupt("record type array overflows payload"));
        }
        let mut values = Vec::with_capacity(num_cols);
        let mut cursor = 1 + num_cols;
        for i in 0..num_cols {
            let code = data[1 + i];
            let width = match code {
                SERIAL_NULL => 0,
                SERIAL_TINYINT | SERIAL_YEAR => 1,
                SERIAL_SMALLINT => 2,
                SERIAL_INT | SERIAL_TIME => 4,
                SERIAL_BIGINT | SERIAL_FLOAT | SERIAL_DATETIME | SERIAL_DATE => 8,
                c if c >= SERIAL_TEXT => (c - SERIAL_TEXT) as usize,
                c => return Err(corrupt(format!("unknown serial type code {:#04x}", c))),
            };
            if cursor + width > data.len() {
                return Err(corrupt("record value data overflows payload"));
            }
            let value = match code {
                SERIAL_NULL => ColumnValue::Null,
                SERIAL_TINYINT => ColumnValue::TinyInt(bytes::read_i8(data, cursor)),
                SERIAL_SMALLINT => ColumnValue::SmallInt(bytes::read_i16(data, cursor)),
                SERIAL_INT => ColumnValue::Int(bytes::read_i32(data, cursor)),
                SERIAL_BIGINT => ColumnValue::BigInt(bytes::read_i64(data, cursor)),
                SERIAL_FLOAT => ColumnValue::Float(bytes::read_f64(data, cursor)),
                SERIAL_YEAR => ColumnValue::Year(bytes::read_i8(data, cursor)),
                SERIAL_TIME => ColumnValue::Time(bytes::read_i32(data, cursor)),
                SERIAL_DATETIME => ColumnValue::DateTime(bytes::read_u64(data, cursor)),
                SERIAL_DATE => ColumnValue::Date(bytes::read_u64(data, cursor)),
                _ => {
                    let text = String::from_utf8_lossy(&data[cursor..cursor + width]).into_owned();
                    ColumnValue::Text(text)
                }
            };
            values.push(value);
            cursor += width;
        }
        Ok(RowData::new(values))
    }
}
