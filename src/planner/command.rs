//! Parsed statements, as handed to the executor.

use crate::types::value::{ColumnDefinition, LiteralValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub column_name: String,
    pub op: Operator,
    pub literal: LiteralValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ShowTables,
    CreateTable {
        table_name: String,
        columns: Vec<ColumnDefinition>,
    },
    DropTable {
        table_name: String,
    },
    Insert {
        table_name: String,
        column_names: Vec<String>,
        values: Vec<LiteralValue>,
    },
    Select {
        projection: Projection,
        table_name: String,
        condition: Option<WhereClause>,
    },
    Delete {
        table_name: String,
        condition: Option<WhereClause>,
    },
    Update {
        table_name: String,
        column_name: String,
        value: LiteralValue,
        condition: Option<WhereClause>,
    },
    CreateIndex {
        is_unique: bool,
        table_name: String,
        column_name: String,
    },
    Exit,
}
