use crate::executor::insert::ensure_unique;
use crate::executor::predicate::{resolve_condition, row_matches};
use crate::executor::require_table;
use crate::planner::command::WhereClause;
use crate::storage::database::Database;
use crate::storage::table::Scan;
use crate::types::error::{DatabaseError, Result};
use crate::types::value::LiteralValue;

pub fn update(
    database: &mut Database,
    table_name: &str,
    column_name: &str,
    value: &LiteralValue,
    condition: &Option<WhereClause>,
) -> Result<()> {
    let mut table = require_table(database, table_name)?;
    let target = table
        .column_index(column_name)
        .ok_or_else(|| DatabaseError::ColumnNotFound {
            name: column_name.to_string(),
            table: table_name.to_string(),
        })?;
    let column = table.columns()[target].clone();
    let new_value = column.value_from_literal(value)?;

    // Uniqueness is checked against every stored row before any row is
    // touched, so a value already present anywhere fails the update.
    if column.requires_unique() {
        ensure_unique(&mut table, target, &new_value, &column)?;
    }

    let resolved = resolve_condition(&table, condition)?;
    table.map_over_records(|_, page, mut cell| {
        if row_matches(&cell.payload, &resolved) {
            cell.payload.values[target] = new_value.clone();
            page.update_cell(&cell)?;
        }
        Ok(Scan::Continue)
    })?;
    Ok(())
}
