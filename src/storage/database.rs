use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::table::{Scan, Table};
use crate::storage::{COLUMNS_SCHEMA_NAME, INITIAL_ROW_ID, TABLES_SCHEMA_NAME, TABLE_FILE_EXT};
use crate::types::error::{DatabaseError, Result};
use crate::types::row::RowData;
use crate::types::value::{ColumnDefinition, ColumnModifiers, ColumnType, ColumnValue};
use crate::types::{PageCount, PageLength, PageNo, RowId, NULL_PAGE_NO};

/// Authoritative per-table bookkeeping stored in `davisbase_tables`.
struct TableInfo {
    root_page_no: PageNo,
    page_count: PageCount,
    next_row_id: RowId,
    page_length: PageLength,
}

fn tables_schema_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("table_name", ColumnType::Text),
        ColumnDefinition::new("root_page_no", ColumnType::Int),
        ColumnDefinition::new("page_count", ColumnType::Int),
        ColumnDefinition::new("next_row_id", ColumnType::Int),
        ColumnDefinition::new("page_length", ColumnType::SmallInt),
    ]
}

fn columns_schema_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("table_name", ColumnType::Text),
        ColumnDefinition::new("column_name", ColumnType::Text),
        ColumnDefinition::new("data_type", ColumnType::TinyInt),
        ColumnDefinition::new("ordinal_position", ColumnType::TinyInt),
        ColumnDefinition::new("is_nullable", ColumnType::TinyInt),
        ColumnDefinition::new("is_primary", ColumnType::TinyInt),
        ColumnDefinition::new("is_unique", ColumnType::TinyInt),
    ]
}

fn open_new_file(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}

fn open_existing_file(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().read(true).write(true).open(path)?)
}

fn schema_row_error(reason: &str) -> DatabaseError {
    DatabaseError::PageCorruption {
        page_no: NULL_PAGE_NO,
        reason: reason.to_string(),
    }
}

fn text_at(values: &[ColumnValue], index: usize) -> Result<&str> {
    match values.get(index) {
        Some(ColumnValue::Text(s)) => Ok(s),
        _ => Err(schema_row_error("schema row holds a non-text value")),
    }
}

fn int_at(values: &[ColumnValue], index: usize) -> Result<i32> {
    match values.get(index) {
        Some(ColumnValue::Int(v)) => Ok(*v),
        _ => Err(schema_row_error("schema row holds a non-int value")),
    }
}

fn smallint_at(values: &[ColumnValue], index: usize) -> Result<i16> {
    match values.get(index) {
        Some(ColumnValue::SmallInt(v)) => Ok(*v),
        _ => Err(schema_row_error("schema row holds a non-smallint value")),
    }
}

fn tinyint_at(values: &[ColumnValue], index: usize) -> Result<i8> {
    match values.get(index) {
        Some(ColumnValue::TinyInt(v)) => Ok(*v),
        _ => Err(schema_row_error("schema row holds a non-tinyint value")),
    }
}

fn parse_table_info(values: &[ColumnValue]) -> Result<TableInfo> {
    Ok(TableInfo {
        root_page_no: int_at(values, 1)?,
        page_count: int_at(values, 2)?,
        next_row_id: int_at(values, 3)?,
        page_length: smallint_at(values, 4)? as PageLength,
    })
}

fn parse_column_definition(values: &[ColumnValue]) -> Result<ColumnDefinition> {
    let name = text_at(values, 1)?.to_string();
    let code = tinyint_at(values, 2)? as u8;
    let column_type = ColumnType::from_code(code)
        .ok_or_else(|| schema_row_error("schema row holds an unknown column type code"))?;
    // The catalog stores a single nullability column; both modifier flags
    // are reconstructed from it.
    let is_null = tinyint_at(values, 4)? != 0;
    let modifiers = ColumnModifiers {
        is_null,
        not_null: !is_null,
        primary_key: tinyint_at(values, 5)? != 0,
        auto_increment: false,
        unique: tinyint_at(values, 6)? != 0,
        default_value: None,
    };
    Ok(ColumnDefinition {
        name,
        column_type,
        modifiers,
    })
}

/// Owns a database directory and the two schema tables that describe
/// every table in it, themselves included.
pub struct Database {
    directory: PathBuf,
    default_page_length: PageLength,
    bootstrapping: bool,
    tables_schema: Table,
    columns_schema: Table,
}

impl Database {
    /// Open the schema tables in `directory`, creating and seeding them on
    /// first use. Errors here are fatal to the caller; a half-created
    /// schema pair is not recovered.
    pub fn open(directory: impl AsRef<Path>, default_page_length: PageLength) -> Result<Database> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.is_dir() {
            return Err(DatabaseError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("database directory {} not found", directory.display()),
            )));
        }

        let tables_path = directory.join(format!("{}{}", TABLES_SCHEMA_NAME, TABLE_FILE_EXT));
        let columns_path = directory.join(format!("{}{}", COLUMNS_SCHEMA_NAME, TABLE_FILE_EXT));

        if tables_path.is_file() && columns_path.is_file() {
            Self::open_schema(directory, default_page_length, &tables_path, &columns_path)
        } else {
            Self::create_schema(directory, default_page_length, &tables_path, &columns_path)
        }
    }

    fn open_schema(
        directory: PathBuf,
        default_page_length: PageLength,
        tables_path: &Path,
        columns_path: &Path,
    ) -> Result<Database> {
        // Open the tables schema with placeholder header values; page 0 is
        // always its leftmost leaf, so a full scan works before the real
        // root page number is known.
        let mut probe = Table::new(
            TABLES_SCHEMA_NAME.to_string(),
            open_existing_file(tables_path)?,
            0,
            0,
            0,
            default_page_length,
            tables_schema_columns(),
        );

        let tables_info = Self::find_table_info(&mut probe, TABLES_SCHEMA_NAME)?
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: TABLES_SCHEMA_NAME.to_string(),
            })?;
        let mut tables_schema = Table::new(
            TABLES_SCHEMA_NAME.to_string(),
            open_existing_file(tables_path)?,
            tables_info.root_page_no,
            tables_info.next_row_id,
            tables_info.page_count,
            tables_info.page_length,
            tables_schema_columns(),
        );

        let columns_info = Self::find_table_info(&mut tables_schema, COLUMNS_SCHEMA_NAME)?
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: COLUMNS_SCHEMA_NAME.to_string(),
            })?;
        let mut columns_schema = Table::new(
            COLUMNS_SCHEMA_NAME.to_string(),
            open_existing_file(columns_path)?,
            columns_info.root_page_no,
            columns_info.next_row_id,
            columns_info.page_count,
            columns_info.page_length,
            columns_schema_columns(),
        );

        // Re-read both column lists from the catalog itself.
        let tables_columns = Self::read_columns_info(&mut columns_schema, TABLES_SCHEMA_NAME)?;
        let columns_columns = Self::read_columns_info(&mut columns_schema, COLUMNS_SCHEMA_NAME)?;
        let tables_schema = Table::new(
            TABLES_SCHEMA_NAME.to_string(),
            open_existing_file(tables_path)?,
            tables_info.root_page_no,
            tables_info.next_row_id,
            tables_info.page_count,
            tables_info.page_length,
            tables_columns,
        );
        let columns_schema = Table::new(
            COLUMNS_SCHEMA_NAME.to_string(),
            open_existing_file(columns_path)?,
            columns_info.root_page_no,
            columns_info.next_row_id,
            columns_info.page_count,
            columns_info.page_length,
            columns_columns,
        );

        debug!(directory = %directory.display(), "opened existing schema tables");
        Ok(Database {
            directory,
            default_page_length,
            bootstrapping: false,
            tables_schema,
            columns_schema,
        })
    }

    fn create_schema(
        directory: PathBuf,
        default_page_length: PageLength,
        tables_path: &Path,
        columns_path: &Path,
    ) -> Result<Database> {
        let tables_schema = Table::create(
            TABLES_SCHEMA_NAME.to_string(),
            open_new_file(tables_path)?,
            INITIAL_ROW_ID,
            default_page_length,
            tables_schema_columns(),
        )?;
        let columns_schema = Table::create(
            COLUMNS_SCHEMA_NAME.to_string(),
            open_new_file(columns_path)?,
            INITIAL_ROW_ID,
            default_page_length,
            columns_schema_columns(),
        )?;

        let mut database = Database {
            directory,
            default_page_length,
            bootstrapping: true,
            tables_schema,
            columns_schema,
        };

        // Seed the catalog with placeholder bookkeeping; the real values
        // are patched in below once every seed row is committed. The
        // bootstrapping flag keeps these appends from recursing into
        // schema-row updates.
        for name in [TABLES_SCHEMA_NAME, COLUMNS_SCHEMA_NAME] {
            database.append_to_tables_schema(RowData::new(vec![
                ColumnValue::Text(name.to_string()),
                ColumnValue::Int(0),
                ColumnValue::Int(0),
                ColumnValue::Int(0),
                ColumnValue::SmallInt(default_page_length as i16),
            ]))?;
        }
        for (name, columns) in [
            (TABLES_SCHEMA_NAME, tables_schema_columns()),
            (COLUMNS_SCHEMA_NAME, columns_schema_columns()),
        ] {
            for (index, column) in columns.iter().enumerate() {
                database.append_to_columns_schema(Self::column_schema_row(name, column, index))?;
            }
        }

        let tables_entry = (
            database.tables_schema.root_page_no(),
            database.tables_schema.page_count(),
            database.tables_schema.next_row_id(),
        );
        let columns_entry = (
            database.columns_schema.root_page_no(),
            database.columns_schema.page_count(),
            database.columns_schema.next_row_id(),
        );
        Self::write_table_entry(
            &mut database.tables_schema,
            TABLES_SCHEMA_NAME,
            tables_entry.0,
            tables_entry.1,
            tables_entry.2,
        )?;
        Self::write_table_entry(
            &mut database.tables_schema,
            COLUMNS_SCHEMA_NAME,
            columns_entry.0,
            columns_entry.1,
            columns_entry.2,
        )?;

        database.bootstrapping = false;
        debug!(directory = %database.directory.display(), "bootstrapped schema tables");
        Ok(database)
    }

    fn column_schema_row(table_name: &str, column: &ColumnDefinition, index: usize) -> RowData {
        RowData::new(vec![
            ColumnValue::Text(table_name.to_string()),
            ColumnValue::Text(column.name.clone()),
            ColumnValue::TinyInt(column.column_type.code() as i8),
            ColumnValue::TinyInt((index + 1) as i8),
            ColumnValue::TinyInt(i8::from(!column.modifiers.not_null)),
            ColumnValue::TinyInt(i8::from(column.modifiers.primary_key)),
            ColumnValue::TinyInt(i8::from(column.modifiers.unique)),
        ])
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn default_page_length(&self) -> PageLength {
        self.default_page_length
    }

    fn table_path(&self, table_name: &str) -> PathBuf {
        self.directory
            .join(format!("{}{}", table_name, TABLE_FILE_EXT))
    }

    /// Scan `davisbase_tables` for one table's bookkeeping row.
    fn find_table_info(tables_schema: &mut Table, table_name: &str) -> Result<Option<TableInfo>> {
        let mut found = None;
        tables_schema.map_over_records(|_, _, cell| {
            if text_at(&cell.payload.values, 0)? == table_name {
                found = Some(parse_table_info(&cell.payload.values)?);
                return Ok(Scan::Stop);
            }
            Ok(Scan::Continue)
        })?;
        Ok(found)
    }

    /// Collect one table's column definitions from `davisbase_columns`,
    /// in stored (ordinal) order.
    fn read_columns_info(
        columns_schema: &mut Table,
        table_name: &str,
    ) -> Result<Vec<ColumnDefinition>> {
        let mut columns = Vec::new();
        columns_schema.map_over_records(|_, _, cell| {
            if text_at(&cell.payload.values, 0)? == table_name {
                columns.push(parse_column_definition(&cell.payload.values)?);
            }
            Ok(Scan::Continue)
        })?;
        Ok(columns)
    }

    /// Rewrite one table's bookkeeping columns in place.
    fn write_table_entry(
        tables_schema: &mut Table,
        table_name: &str,
        root_page_no: PageNo,
        page_count: PageCount,
        next_row_id: RowId,
    ) -> Result<()> {
        let mut found = false;
        tables_schema.map_over_records(|_, page, mut cell| {
            if text_at(&cell.payload.values, 0)? == table_name {
                cell.payload.values[1] = ColumnValue::Int(root_page_no);
                cell.payload.values[2] = ColumnValue::Int(page_count);
                cell.payload.values[3] = ColumnValue::Int(next_row_id);
                page.update_cell(&cell)?;
                found = true;
                return Ok(Scan::Stop);
            }
            Ok(Scan::Continue)
        })?;
        if found {
            Ok(())
        } else {
            Err(DatabaseError::TableNotFound {
                name: table_name.to_string(),
            })
        }
    }

    /// Keep invariant: the catalog row mirrors the live table header.
    /// Suppressed while the catalog is bootstrapping itself.
    fn sync_table_entry(
        &mut self,
        table_name: &str,
        root_page_no: PageNo,
        page_count: PageCount,
        next_row_id: RowId,
    ) -> Result<()> {
        if self.bootstrapping {
            return Ok(());
        }
        Self::write_table_entry(
            &mut self.tables_schema,
            table_name,
            root_page_no,
            page_count,
            next_row_id,
        )
    }

    fn append_to_tables_schema(&mut self, row: RowData) -> Result<()> {
        self.tables_schema.append_record(row)?;
        let (root, pages, next) = (
            self.tables_schema.root_page_no(),
            self.tables_schema.page_count(),
            self.tables_schema.next_row_id(),
        );
        self.sync_table_entry(TABLES_SCHEMA_NAME, root, pages, next)
    }

    fn append_to_columns_schema(&mut self, row: RowData) -> Result<()> {
        self.columns_schema.append_record(row)?;
        let (root, pages, next) = (
            self.columns_schema.root_page_no(),
            self.columns_schema.page_count(),
            self.columns_schema.next_row_id(),
        );
        self.sync_table_entry(COLUMNS_SCHEMA_NAME, root, pages, next)
    }

    /// Append one record to a user table and bring its catalog row up to
    /// date.
    pub fn insert_record(&mut self, table: &mut Table, row: RowData) -> Result<()> {
        table.append_record(row)?;
        self.sync_table_entry(
            table.name(),
            table.root_page_no(),
            table.page_count(),
            table.next_row_id(),
        )
    }

    /// Create a table file plus its catalog rows and return the handle.
    pub fn create_table(
        &mut self,
        table_name: &str,
        columns: Vec<ColumnDefinition>,
    ) -> Result<Table> {
        let path = self.table_path(table_name);
        if path.exists() {
            return Err(DatabaseError::TableExists {
                name: table_name.to_string(),
            });
        }

        let table = Table::create(
            table_name.to_string(),
            open_new_file(&path)?,
            INITIAL_ROW_ID,
            self.default_page_length,
            columns,
        )?;

        self.append_to_tables_schema(RowData::new(vec![
            ColumnValue::Text(table_name.to_string()),
            ColumnValue::Int(table.root_page_no()),
            ColumnValue::Int(table.page_count()),
            ColumnValue::Int(table.next_row_id()),
            ColumnValue::SmallInt(table.page_length() as i16),
        ]))?;
        for (index, column) in table.columns().iter().enumerate() {
            self.append_to_columns_schema(Self::column_schema_row(table_name, column, index))?;
        }

        debug!(table = table_name, "created table");
        Ok(table)
    }

    /// Look a table up in the catalog and open its file. `Ok(None)` means
    /// the catalog has no such table.
    pub fn get_table(&mut self, table_name: &str) -> Result<Option<Table>> {
        let Some(info) = Self::find_table_info(&mut self.tables_schema, table_name)? else {
            return Ok(None);
        };

        let path = self.table_path(table_name);
        if !path.is_file() {
            return Err(DatabaseError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("table file {} is missing", path.display()),
            )));
        }

        let columns = Self::read_columns_info(&mut self.columns_schema, table_name)?;
        Ok(Some(Table::new(
            table_name.to_string(),
            open_existing_file(&path)?,
            info.root_page_no,
            info.next_row_id,
            info.page_count,
            info.page_length,
            columns,
        )))
    }

    /// Delete a table's catalog rows and remove its file.
    pub fn remove_table(&mut self, table_name: &str) -> Result<()> {
        let path = self.table_path(table_name);
        if !path.is_file() {
            return Err(DatabaseError::TableNotFound {
                name: table_name.to_string(),
            });
        }

        self.tables_schema.map_over_records(|index, page, cell| {
            if text_at(&cell.payload.values, 0)? == table_name {
                page.delete_record(index)?;
                return Ok(Scan::Goto(index));
            }
            Ok(Scan::Continue)
        })?;
        self.columns_schema.map_over_records(|index, page, cell| {
            if text_at(&cell.payload.values, 0)? == table_name {
                page.delete_record(index)?;
                return Ok(Scan::Goto(index));
            }
            Ok(Scan::Continue)
        })?;

        fs::remove_file(path)?;
        debug!(table = table_name, "dropped table");
        Ok(())
    }

    /// Flip the `is_unique` flag on one catalog column row.
    pub fn make_column_unique(&mut self, table_name: &str, column_name: &str) -> Result<()> {
        let mut found = false;
        self.columns_schema.map_over_records(|_, page, mut cell| {
            if text_at(&cell.payload.values, 0)? == table_name
                && text_at(&cell.payload.values, 1)? == column_name
            {
                cell.payload.values[6] = ColumnValue::TinyInt(1);
                page.update_cell(&cell)?;
                found = true;
                return Ok(Scan::Stop);
            }
            Ok(Scan::Continue)
        })?;
        if found {
            Ok(())
        } else {
            Err(DatabaseError::ColumnNotFound {
                name: column_name.to_string(),
                table: table_name.to_string(),
            })
        }
    }

    /// Names of every table in the catalog, schema tables included, in
    /// catalog order.
    pub fn table_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        self.tables_schema.map_over_records(|_, _, cell| {
            names.push(text_at(&cell.payload.values, 0)?.to_string());
            Ok(Scan::Continue)
        })?;
        Ok(names)
    }
}
