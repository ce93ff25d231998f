pub mod database;
pub mod page;
pub mod table;

use crate::types::RowId;

pub const TABLE_FILE_EXT: &str = ".tbl";
pub const INITIAL_ROW_ID: RowId = 1;

pub const TABLES_SCHEMA_NAME: &str = "davisbase_tables";
pub const COLUMNS_SCHEMA_NAME: &str = "davisbase_columns";
