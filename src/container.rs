use crate::error::ContainerError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque, insertion-ordered row identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(u64);

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        RowId(id)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    id: RowId,
    cells: HashMap<String, String>,
}

impl Row {
    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

/// In-memory table: ordered string columns and ordered rows of string cells.
///
/// Every row holds exactly one cell per declared column. Columns are unique;
/// declaring a column a second time is a no-op.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TabularContainer {
    columns: Vec<String>,
    rows: Vec<Row>,
    next_row_id: u64,
}

impl TabularContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a column at the end of the column list.
    ///
    /// Returns `false` when the column already exists.
    pub fn add_column(&mut self, column: &str) -> bool {
        if self.contains_column(column) {
            return false;
        }
        self.columns.push(column.to_string());
        true
    }

    /// Appends a row whose values follow the column order.
    ///
    /// Missing trailing values become empty cells, values past the last
    /// column are ignored.
    pub fn push_row<I, V>(&mut self, values: I) -> RowId
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let mut values = values.into_iter();
        let cells = self
            .columns
            .iter()
            .map(|column| {
                let value = values.next().map(Into::into).unwrap_or_default();
                (column.clone(), value)
            })
            .collect();

        self.next_row_id += 1;
        let id = RowId(self.next_row_id);
        self.rows.push(Row { id, cells });
        id
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn row(&self, id: RowId) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn cell(&self, id: RowId, column: &str) -> Option<&str> {
        self.row(id).and_then(|row| row.get(column))
    }

    /// Cell values of a row in column order.
    pub fn row_values<'a>(&'a self, row: &'a Row) -> impl Iterator<Item = &'a str> + 'a {
        self.columns
            .iter()
            .map(move |column| row.get(column).unwrap_or_default())
    }

    pub fn set_cell(
        &mut self,
        id: RowId,
        column: &str,
        value: impl Into<String>,
    ) -> Result<(), ContainerError> {
        if !self.contains_column(column) {
            return Err(ContainerError::UnknownColumn(column.to_string()));
        }
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(ContainerError::UnknownRow(id))?;
        row.cells.insert(column.to_string(), value.into());
        Ok(())
    }
}
