pub mod create_table;
pub mod delete;
pub mod index;
pub mod insert;
pub mod predicate;
pub mod select;
pub mod update;

use std::io::Write;

use crate::planner::Command;
use crate::storage::database::Database;
use crate::storage::table::Table;
use crate::types::error::{DatabaseError, Result};

/// Run one parsed command against the engine. Query output goes to `out`;
/// mutating commands print nothing.
pub fn execute(database: &mut Database, command: Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::ShowTables => create_table::show_tables(database, out),
        Command::CreateTable {
            table_name,
            columns,
        } => create_table::create_table(database, &table_name, columns),
        Command::DropTable { table_name } => create_table::drop_table(database, &table_name),
        Command::Insert {
            table_name,
            column_names,
            values,
        } => insert::insert_into(database, &table_name, &column_names, &values),
        Command::Select {
            projection,
            table_name,
            condition,
        } => select::select(database, &projection, &table_name, &condition, out),
        Command::Delete {
            table_name,
            condition,
        } => delete::delete_from(database, &table_name, &condition),
        Command::Update {
            table_name,
            column_name,
            value,
            condition,
        } => update::update(database, &table_name, &column_name, &value, &condition),
        Command::CreateIndex {
            is_unique,
            table_name,
            column_name,
        } => index::create_index(database, is_unique, &table_name, &column_name),
        // EXIT belongs to the REPL; reaching the engine is a no-op.
        Command::Exit => Ok(()),
    }
}

pub(crate) fn require_table(database: &mut Database, table_name: &str) -> Result<Table> {
    database
        .get_table(table_name)?
        .ok_or_else(|| DatabaseError::TableNotFound {
            name: table_name.to_string(),
        })
}
