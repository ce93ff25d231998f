use tracing::debug;

use crate::executor::require_table;
use crate::storage::database::Database;
use crate::storage::table::Scan;
use crate::types::error::{DatabaseError, Result};
use crate::types::value::ColumnValue;

/// No physical index file is built; the command verifies that the
/// column's values are distinct and flips its uniqueness flag in the
/// catalog.
pub fn create_index(
    database: &mut Database,
    is_unique: bool,
    table_name: &str,
    column_name: &str,
) -> Result<()> {
    let mut table = require_table(database, table_name)?;
    let column_index =
        table
            .column_index(column_name)
            .ok_or_else(|| DatabaseError::ColumnNotFound {
                name: column_name.to_string(),
                table: table_name.to_string(),
            })?;

    let mut seen: Vec<ColumnValue> = Vec::new();
    let mut duplicate = false;
    table.map_over_records(|_, _, cell| {
        let value = cell.payload.values[column_index].clone();
        if seen.iter().any(|existing| existing == &value) {
            duplicate = true;
            return Ok(Scan::Stop);
        }
        seen.push(value);
        Ok(Scan::Continue)
    })?;
    if duplicate {
        return Err(DatabaseError::UniqueViolation {
            column: column_name.to_string(),
        });
    }

    debug!(table = table_name, column = column_name, unique = is_unique, "marking column unique");
    database.make_column_unique(table_name, column_name)
}
