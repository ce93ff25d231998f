use crate::executor::predicate::{resolve_where, row_matches};
use crate::executor::require_table;
use crate::planner::command::WhereClause;
use crate::storage::database::Database;
use crate::storage::table::Scan;
use crate::types::error::{DatabaseError, Result};

pub fn delete_from(
    database: &mut Database,
    table_name: &str,
    condition: &Option<WhereClause>,
) -> Result<()> {
    let clause = condition.as_ref().ok_or(DatabaseError::WhereRequired)?;
    let mut table = require_table(database, table_name)?;
    let resolved = Some(resolve_where(&table, clause)?);

    table.map_over_records(|index, page, cell| {
        if row_matches(&cell.payload, &resolved) {
            page.delete_record(index)?;
            // The slot array shifted; re-visit the same index.
            return Ok(Scan::Goto(index));
        }
        Ok(Scan::Continue)
    })?;
    Ok(())
}
