//! WHERE-clause evaluation against stored rows.

use std::cmp::Ordering;

use crate::planner::command::{Operator, WhereClause};
use crate::storage::table::Table;
use crate::types::error::{DatabaseError, Result};
use crate::types::row::RowData;
use crate::types::value::ColumnValue;

/// A WHERE clause bound to a table: the column's index and the literal
/// coerced to the column's type.
#[derive(Debug, Clone)]
pub struct ResolvedWhere {
    pub column_index: usize,
    pub op: Operator,
    pub value: ColumnValue,
}

pub fn resolve_where(table: &Table, clause: &WhereClause) -> Result<ResolvedWhere> {
    let column_index =
        table
            .column_index(&clause.column_name)
            .ok_or_else(|| DatabaseError::ColumnNotFound {
                name: clause.column_name.clone(),
                table: table.name().to_string(),
            })?;
    let column = &table.columns()[column_index];
    let value = ColumnValue::from_literal(column.column_type, &clause.literal)?;
    Ok(ResolvedWhere {
        column_index,
        op: clause.op,
        value,
    })
}

pub fn resolve_condition(
    table: &Table,
    condition: &Option<WhereClause>,
) -> Result<Option<ResolvedWhere>> {
    condition
        .as_ref()
        .map(|clause| resolve_where(table, clause))
        .transpose()
}

/// Compare one stored value against the coerced literal. EQUAL holds for
/// NULL only against NULL; ordering comparisons involving NULL are false.
pub fn is_where_satisfied(row_value: &ColumnValue, op: Operator, literal_value: &ColumnValue) -> bool {
    if row_value.is_null() || literal_value.is_null() {
        return op == Operator::Equal && row_value.is_null() && literal_value.is_null();
    }
    match op {
        Operator::Equal => row_value == literal_value,
        Operator::Less => row_value.partial_cmp(literal_value) == Some(Ordering::Less),
        Operator::LessEqual => matches!(
            row_value.partial_cmp(literal_value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::Greater => row_value.partial_cmp(literal_value) == Some(Ordering::Greater),
        Operator::GreaterEqual => matches!(
            row_value.partial_cmp(literal_value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

/// A missing condition matches every row.
pub fn row_matches(row: &RowData, resolved: &Option<ResolvedWhere>) -> bool {
    match resolved {
        None => true,
        Some(clause) => row
            .values
            .get(clause.column_index)
            .is_some_and(|value| is_where_satisfied(value, clause.op, &clause.value)),
    }
}
