use crate::executor::require_table;
use crate::storage::database::Database;
use crate::storage::table::{Scan, Table};
use crate::types::error::{DatabaseError, Result};
use crate::types::row::RowData;
use crate::types::value::{ColumnDefinition, ColumnValue, LiteralValue};

pub fn insert_into(
    database: &mut Database,
    table_name: &str,
    column_names: &[String],
    values: &[LiteralValue],
) -> Result<()> {
    let mut table = require_table(database, table_name)?;
    let columns = table.columns().to_vec();

    // With a column list, unnamed positions are filled with NULL; the
    // parsed DEFAULT clause is deliberately not applied here.
    let literals: Vec<LiteralValue> = if column_names.is_empty() {
        if values.len() != columns.len() {
            return Err(DatabaseError::ColumnCountMismatch {
                expected: columns.len(),
                actual: values.len(),
            });
        }
        values.to_vec()
    } else {
        if column_names.len() != values.len() {
            return Err(DatabaseError::ColumnCountMismatch {
                expected: column_names.len(),
                actual: values.len(),
            });
        }
        let mut literals = vec![LiteralValue::Null; columns.len()];
        for (name, value) in column_names.iter().zip(values) {
            let index = table
                .column_index(name)
                .ok_or_else(|| DatabaseError::ColumnNotFound {
                    name: name.clone(),
                    table: table_name.to_string(),
                })?;
            literals[index] = value.clone();
        }
        literals
    };

    let mut row_values = Vec::with_capacity(columns.len());
    for (column, literal) in columns.iter().zip(&literals) {
        row_values.push(column.value_from_literal(literal)?);
    }

    for (index, column) in columns.iter().enumerate() {
        if column.requires_unique() {
            ensure_unique(&mut table, index, &row_values[index], column)?;
        }
    }

    database.insert_record(&mut table, RowData::new(row_values))
}

/// Scan for an existing row already holding `candidate` in the column.
pub(crate) fn ensure_unique(
    table: &mut Table,
    column_index: usize,
    candidate: &ColumnValue,
    column: &ColumnDefinition,
) -> Result<()> {
    let mut duplicate = false;
    table.map_over_records(|_, _, cell| {
        let held = cell
            .payload
            .values
            .get(column_index)
            .is_some_and(|value| value == candidate);
        if held {
            duplicate = true;
            return Ok(Scan::Stop);
        }
        Ok(Scan::Continue)
    })?;
    if duplicate {
        Err(DatabaseError::UniqueViolation {
            column: column.name.clone(),
        })
    } else {
        Ok(())
    }
}
