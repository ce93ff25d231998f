use std::collections::HashSet;
use std::io::Write;

use crate::storage::database::Database;
use crate::types::error::{DatabaseError, Result};
use crate::types::value::ColumnDefinition;

pub fn show_tables(database: &mut Database, out: &mut dyn Write) -> Result<()> {
    for name in database.table_names()? {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}

pub fn create_table(
    database: &mut Database,
    table_name: &str,
    columns: Vec<ColumnDefinition>,
) -> Result<()> {
    // Ordinal positions are stored as TINYINT in the catalog.
    if columns.len() > i8::MAX as usize {
        return Err(DatabaseError::Parse {
            details: "a table may declare at most 127 columns".to_string(),
        });
    }
    let mut names = HashSet::new();
    for column in &columns {
        if !names.insert(column.name.as_str()) {
            return Err(DatabaseError::Parse {
                details: format!("duplicate column name: {}", column.name),
            });
        }
    }
    database.create_table(table_name, columns)?;
    Ok(())
}

pub fn drop_table(database: &mut Database, table_name: &str) -> Result<()> {
    database.remove_table(table_name)
}
