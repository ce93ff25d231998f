use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::types::error::{DatabaseError, Result};
use crate::types::MAX_TEXT_LENGTH;

/// Logical column types, in catalog-code order. The code stored in the
/// `data_type` column of `davisbase_columns` is the discriminant below;
/// it is distinct from the serial type codes used inside record payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Year,
    Time,
    DateTime,
    Date,
    Text,
}

impl ColumnType {
    pub fn code(self) -> u8 {
        match self {
            ColumnType::TinyInt => 0,
            ColumnType::SmallInt => 1,
            ColumnType::Int => 2,
            ColumnType::BigInt => 3,
            ColumnType::Float => 4,
            ColumnType::Year => 5,
            ColumnType::Time => 6,
            ColumnType::DateTime => 7,
            ColumnType::Date => 8,
            ColumnType::Text => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<ColumnType> {
        match code {
            0 => Some(ColumnType::TinyInt),
            1 => Some(ColumnType::SmallInt),
            2 => Some(ColumnType::Int),
            3 => Some(ColumnType::BigInt),
            4 => Some(ColumnType::Float),
            5 => Some(ColumnType::Year),
            6 => Some(ColumnType::Time),
            7 => Some(ColumnType::DateTime),
            8 => Some(ColumnType::Date),
            9 => Some(ColumnType::Text),
            _ => None,
        }
    }

    /// Resolve a type keyword from the CREATE TABLE grammar.
    pub fn from_keyword(word: &str) -> Option<ColumnType> {
        match word.to_ascii_lowercase().as_str() {
            "tinyint" => Some(ColumnType::TinyInt),
            "smallint" => Some(ColumnType::SmallInt),
            "int" | "integer" => Some(ColumnType::Int),
            "bigint" => Some(ColumnType::BigInt),
            "float" | "real" | "double" => Some(ColumnType::Float),
            "year" => Some(ColumnType::Year),
            "time" => Some(ColumnType::Time),
            "datetime" => Some(ColumnType::DateTime),
            "date" => Some(ColumnType::Date),
            "text" => Some(ColumnType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::TinyInt => "TINYINT",
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Int => "INT",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Float => "FLOAT",
            ColumnType::Year => "YEAR",
            ColumnType::Time => "TIME",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Date => "DATE",
            ColumnType::Text => "TEXT",
        };
        write!(f, "{}", name)
    }
}

/// A literal value as produced by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Null => write!(f, "NULL"),
            LiteralValue::Text(s) => write!(f, "'{}'", s),
            LiteralValue::Integer(i) => write!(f, "{}", i),
            LiteralValue::Float(r) => write!(f, "{}", r),
        }
    }
}

/// A stored column value. NULL is its own variant; every other variant
/// carries the fixed-width representation mandated by its serial type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ColumnValue {
    Null,
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f64),
    Year(i8),
    Time(i32),
    DateTime(u64),
    Date(u64),
    Text(String),
}

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            ColumnValue::Null => None,
            ColumnValue::TinyInt(_) => Some(ColumnType::TinyInt),
            ColumnValue::SmallInt(_) => Some(ColumnType::SmallInt),
            ColumnValue::Int(_) => Some(ColumnType::Int),
            ColumnValue::BigInt(_) => Some(ColumnType::BigInt),
            ColumnValue::Float(_) => Some(ColumnType::Float),
            ColumnValue::Year(_) => Some(ColumnType::Year),
            ColumnValue::Time(_) => Some(ColumnType::Time),
            ColumnValue::DateTime(_) => Some(ColumnType::DateTime),
            ColumnValue::Date(_) => Some(ColumnType::Date),
            ColumnValue::Text(_) => Some(ColumnType::Text),
        }
    }

    /// Number of bytes this value contributes to a record payload's data
    /// section. NULL contributes nothing; its type code alone marks it.
    pub fn width(&self) -> usize {
        match self {
            ColumnValue::Null => 0,
            ColumnValue::TinyInt(_) | ColumnValue::Year(_) => 1,
            ColumnValue::SmallInt(_) => 2,
            ColumnValue::Int(_) | ColumnValue::Time(_) => 4,
            ColumnValue::BigInt(_)
            | ColumnValue::Float(_)
            | ColumnValue::DateTime(_)
            | ColumnValue::Date(_) => 8,
            ColumnValue::Text(s) => s.len(),
        }
    }

    /// Convert a non-NULL literal to a value of the target column type,
    /// applying the range-checked cast rules. NULL handling belongs to
    /// [`ColumnDefinition::value_from_literal`], which knows the modifiers.
    pub fn from_literal(target: ColumnType, literal: &LiteralValue) -> Result<ColumnValue> {
        match literal {
            LiteralValue::Null => Ok(ColumnValue::Null),
            LiteralValue::Text(s) => Self::from_text_literal(target, s),
            LiteralValue::Integer(i) => Self::from_integer_literal(target, *i),
            LiteralValue::Float(r) => Self::from_float_literal(target, *r),
        }
    }

    fn from_text_literal(target: ColumnType, text: &str) -> Result<ColumnValue> {
        let mismatch = || DatabaseError::TypeMismatch {
            literal: LiteralValue::Text(text.to_string()).to_string(),
            column_type: target,
        };
        match target {
            ColumnType::Text => {
                if text.len() > MAX_TEXT_LENGTH {
                    return Err(DatabaseError::TextTooLong { length: text.len() });
                }
                Ok(ColumnValue::Text(text.to_string()))
            }
            ColumnType::TinyInt => text
                .trim()
                .parse()
                .map(ColumnValue::TinyInt)
                .map_err(|_| mismatch()),
            ColumnType::SmallInt => text
                .trim()
                .parse()
                .map(ColumnValue::SmallInt)
                .map_err(|_| mismatch()),
            ColumnType::Int => text
                .trim()
                .parse()
                .map(ColumnValue::Int)
                .map_err(|_| mismatch()),
            ColumnType::BigInt => text
                .trim()
                .parse()
                .map(ColumnValue::BigInt)
                .map_err(|_| mismatch()),
            ColumnType::Float => text
                .trim()
                .parse()
                .map(ColumnValue::Float)
                .map_err(|_| mismatch()),
            ColumnType::Year => text
                .trim()
                .parse()
                .map(ColumnValue::Year)
                .map_err(|_| mismatch()),
            ColumnType::Time => {
                if let Ok(time) = NaiveTime::parse_from_str(text.trim(), TIME_FORMAT) {
                    return Ok(ColumnValue::Time(time.num_seconds_from_midnight() as i32));
                }
                text.trim()
                    .parse()
                    .map(ColumnValue::Time)
                    .map_err(|_| mismatch())
            }
            ColumnType::DateTime => {
                if let Ok(dt) = NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT) {
                    return u64::try_from(dt.and_utc().timestamp())
                        .map(ColumnValue::DateTime)
                        .map_err(|_| mismatch());
                }
                if let Ok(date) = NaiveDate::parse_from_str(text.trim(), DATE_FORMAT) {
                    let dt = date.and_time(NaiveTime::MIN);
                    return u64::try_from(dt.and_utc().timestamp())
                        .map(ColumnValue::DateTime)
                        .map_err(|_| mismatch());
                }
                text.trim()
                    .parse()
                    .map(ColumnValue::DateTime)
                    .map_err(|_| mismatch())
            }
            ColumnType::Date => {
                if let Ok(date) = NaiveDate::parse_from_str(text.trim(), DATE_FORMAT) {
                    let dt = date.and_time(NaiveTime::MIN);
                    return u64::try_from(dt.and_utc().timestamp())
                        .map(ColumnValue::Date)
                        .map_err(|_| mismatch());
                }
                text.trim()
                    .parse()
                    .map(ColumnValue::Date)
                    .map_err(|_| mismatch())
            }
        }
    }

    fn from_integer_literal(target: ColumnType, value: i64) -> Result<ColumnValue> {
        let overflow = || DatabaseError::Overflow {
            literal: value.to_string(),
            column_type: target,
        };
        match target {
            ColumnType::TinyInt => i8::try_from(value)
                .map(ColumnValue::TinyInt)
                .map_err(|_| overflow()),
            ColumnType::SmallInt => i16::try_from(value)
                .map(ColumnValue::SmallInt)
                .map_err(|_| overflow()),
            ColumnType::Int => i32::try_from(value)
                .map(ColumnValue::Int)
                .map_err(|_| overflow()),
            ColumnType::BigInt => Ok(ColumnValue::BigInt(value)),
            ColumnType::Float => Ok(ColumnValue::Float(value as f64)),
            ColumnType::Year => i8::try_from(value)
                .map(ColumnValue::Year)
                .map_err(|_| overflow()),
            ColumnType::Time => i32::try_from(value)
                .map(ColumnValue::Time)
                .map_err(|_| overflow()),
            ColumnType::DateTime => u64::try_from(value)
                .map(ColumnValue::DateTime)
                .map_err(|_| overflow()),
            ColumnType::Date => u64::try_from(value)
                .map(ColumnValue::Date)
                .map_err(|_| overflow()),
            ColumnType::Text => Ok(ColumnValue::Text(value.to_string())),
        }
    }

    fn from_float_literal(target: ColumnType, value: f64) -> Result<ColumnValue> {
        let overflow = || DatabaseError::Overflow {
            literal: value.to_string(),
            column_type: target,
        };
        let in_range = |lo: f64, hi: f64| value.is_finite() && value.trunc() >= lo && value.trunc() <= hi;
        match target {
            ColumnType::Float => Ok(ColumnValue::Float(value)),
            ColumnType::TinyInt if in_range(i8::MIN as f64, i8::MAX as f64) => {
                Ok(ColumnValue::TinyInt(value as i8))
            }
            ColumnType::SmallInt if in_range(i16::MIN as f64, i16::MAX as f64) => {
                Ok(ColumnValue::SmallInt(value as i16))
            }
            ColumnType::Int if in_range(i32::MIN as f64, i32::MAX as f64) => {
                Ok(ColumnValue::Int(value as i32))
            }
            ColumnType::BigInt if in_range(i64::MIN as f64, i64::MAX as f64) => {
                Ok(ColumnValue::BigInt(value as i64))
            }
            ColumnType::Year if in_range(i8::MIN as f64, i8::MAX as f64) => {
                Ok(ColumnValue::Year(value as i8))
            }
            ColumnType::Time if in_range(i32::MIN as f64, i32::MAX as f64) => {
                Ok(ColumnValue::Time(value as i32))
            }
            ColumnType::DateTime if in_range(0.0, u64::MAX as f64) => {
                Ok(ColumnValue::DateTime(value as u64))
            }
            ColumnType::Date if in_range(0.0, u64::MAX as f64) => {
                Ok(ColumnValue::Date(value as u64))
            }
            ColumnType::Text => Ok(ColumnValue::Text(value.to_string())),
            _ => Err(overflow()),
        }
    }
}

impl PartialEq for ColumnValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ColumnValue::Null, ColumnValue::Null) => true,
            (ColumnValue::TinyInt(a), ColumnValue::TinyInt(b)) => a == b,
            (ColumnValue::SmallInt(a), ColumnValue::SmallInt(b)) => a == b,
            (ColumnValue::Int(a), ColumnValue::Int(b)) => a == b,
            (ColumnValue::BigInt(a), ColumnValue::BigInt(b)) => a == b,
            (ColumnValue::Float(a), ColumnValue::Float(b)) => a == b,
            (ColumnValue::Year(a), ColumnValue::Year(b)) => a == b,
            (ColumnValue::Time(a), ColumnValue::Time(b)) => a == b,
            (ColumnValue::DateTime(a), ColumnValue::DateTime(b)) => a == b,
            (ColumnValue::Date(a), ColumnValue::Date(b)) => a == b,
            (ColumnValue::Text(a), ColumnValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for ColumnValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (ColumnValue::Null, ColumnValue::Null) => Some(Ordering::Equal),
            (ColumnValue::TinyInt(a), ColumnValue::TinyInt(b)) => a.partial_cmp(b),
            (ColumnValue::SmallInt(a), ColumnValue::SmallInt(b)) => a.partial_cmp(b),
            (ColumnValue::Int(a), ColumnValue::Int(b)) => a.partial_cmp(b),
            (ColumnValue::BigInt(a), ColumnValue::BigInt(b)) => a.partial_cmp(b),
            (ColumnValue::Float(a), ColumnValue::Float(b)) => a.partial_cmp(b),
            (ColumnValue::Year(a), ColumnValue::Year(b)) => a.partial_cmp(b),
            (ColumnValue::Time(a), ColumnValue::Time(b)) => a.partial_cmp(b),
            (ColumnValue::DateTime(a), ColumnValue::DateTime(b)) => a.partial_cmp(b),
            (ColumnValue::Date(a), ColumnValue::Date(b)) => a.partial_cmp(b),
            (ColumnValue::Text(a), ColumnValue::Text(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Null => write!(f, "NULL"),
            ColumnValue::TinyInt(v) => write!(f, "{}", v),
            ColumnValue::SmallInt(v) => write!(f, "{}", v),
            ColumnValue::Int(v) => write!(f, "{}", v),
            ColumnValue::BigInt(v) => write!(f, "{}", v),
            ColumnValue::Float(v) => write!(f, "{}", v),
            ColumnValue::Year(v) => write!(f, "{}", 2000 + i32::from(*v)),
            ColumnValue::Time(v) => {
                let time = u32::try_from(*v)
                    .ok()
                    .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, 0));
                match time {
                    Some(time) => write!(f, "{}", time.format(TIME_FORMAT)),
                    None => write!(f, "{}", v),
                }
            }
            ColumnValue::DateTime(v) => {
                let dt = i64::try_from(*v)
                    .ok()
                    .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0));
                match dt {
                    Some(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
                    None => write!(f, "{}", v),
                }
            }
            ColumnValue::Date(v) => {
                let dt = i64::try_from(*v)
                    .ok()
                    .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0));
                match dt {
                    Some(dt) => write!(f, "{}", dt.format(DATE_FORMAT)),
                    None => write!(f, "{}", v),
                }
            }
            ColumnValue::Text(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnModifiers {
    pub is_null: bool,
    pub not_null: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub default_value: Option<LiteralValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub modifiers: ColumnModifiers,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            modifiers: ColumnModifiers::default(),
        }
    }

    /// PRIMARY KEY implies UNIQUE.
    pub fn requires_unique(&self) -> bool {
        self.modifiers.unique || self.modifiers.primary_key
    }

    /// PRIMARY KEY implies NOT NULL.
    pub fn rejects_null(&self) -> bool {
        self.modifiers.not_null || self.modifiers.primary_key
    }

    /// Build the stored value for this column from a parsed literal,
    /// enforcing the NULL constraint.
    pub fn value_from_literal(&self, literal: &LiteralValue) -> Result<ColumnValue> {
        match literal {
            LiteralValue::Null => {
                if self.rejects_null() {
                    Err(DatabaseError::NullConstraint {
                        column: self.name.clone(),
                    })
                } else {
                    Ok(ColumnValue::Null)
                }
            }
            other => ColumnValue::from_literal(self.column_type, other),
        }
    }
}
