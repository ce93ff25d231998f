use std::io::Write;

use crate::executor::predicate::{resolve_condition, row_matches};
use crate::executor::require_table;
use crate::planner::command::{Projection, WhereClause};
use crate::storage::database::Database;
use crate::storage::table::Scan;
use crate::types::error::{DatabaseError, Result};

pub fn select(
    database: &mut Database,
    projection: &Projection,
    table_name: &str,
    condition: &Option<WhereClause>,
    out: &mut dyn Write,
) -> Result<()> {
    let mut table = require_table(database, table_name)?;
    let resolved = resolve_condition(&table, condition)?;

    let column_indexes: Vec<usize> = match projection {
        Projection::All => (0..table.columns().len()).collect(),
        Projection::Columns(names) => names
            .iter()
            .map(|name| {
                table
                    .column_index(name)
                    .ok_or_else(|| DatabaseError::ColumnNotFound {
                        name: name.clone(),
                        table: table_name.to_string(),
                    })
            })
            .collect::<Result<_>>()?,
    };

    let mut header = String::from("rowid");
    for &index in &column_indexes {
        header.push('|');
        header.push_str(&table.columns()[index].name);
    }
    writeln!(out, "{}", header)?;

    table.map_over_records(|_, _, cell| {
        if row_matches(&cell.payload, &resolved) {
            let mut line = cell.row_id.to_string();
            for &index in &column_indexes {
                line.push('|');
                line.push_str(&cell.payload.values[index].to_string());
            }
            writeln!(out, "{}", line)?;
        }
        Ok(Scan::Continue)
    })?;
    Ok(())
}
