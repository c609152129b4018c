use crate::container::{RowId, TabularContainer};
use crate::error::{ContainerError, PresenterError};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::collections::HashMap;

/// Width given to a column when its header is clicked.
pub const SELECTED_COLUMN_WIDTH: u32 = 777;

/// Editable grid bound to one [`TabularContainer`].
///
/// Starts hidden, read-only and empty. Each successful upload rebinds it and
/// makes it visible and editable.
#[derive(Debug, Default)]
pub struct TablePresenter {
    container: TabularContainer,
    caption: Option<String>,
    visible: bool,
    editable: bool,
    column_widths: HashMap<String, u32>,
    error: Option<String>,
    bound_at: Option<DateTime<Utc>>,
}

/// Serializable snapshot of the presenter, used by the page and the JSON API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub caption: Option<String>,
    pub visible: bool,
    pub editable: bool,
    pub columns: Vec<ColumnView>,
    pub rows: Vec<RowView>,
    pub error: Option<String>,
    pub bound_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnView {
    pub id: String,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub id: RowId,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub row: RowId,
    pub column: String,
    pub value: String,
}

impl TablePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the data source and show the table as editable.
    ///
    /// Column widths from the previous binding are discarded, as is any
    /// pending error.
    pub fn bind(&mut self, container: TabularContainer, caption: impl Into<String>) {
        self.container = container;
        self.caption = Some(caption.into());
        self.column_widths.clear();
        self.visible = true;
        self.editable = true;
        self.error = None;
        self.bound_at = Some(Utc::now());
    }

    /// Widen the clicked column to [`SELECTED_COLUMN_WIDTH`].
    pub fn on_column_header_clicked(&mut self, column_id: &str) -> Result<(), PresenterError> {
        if !self.container.contains_column(column_id) {
            return Err(ContainerError::UnknownColumn(column_id.to_string()).into());
        }
        self.column_widths
            .insert(column_id.to_string(), SELECTED_COLUMN_WIDTH);
        info!("column header clicked: {column_id}");
        Ok(())
    }

    pub fn edit_cell(
        &mut self,
        row: RowId,
        column: &str,
        value: impl Into<String>,
    ) -> Result<(), PresenterError> {
        if !self.editable {
            return Err(PresenterError::NotEditable);
        }
        self.container.set_cell(row, column, value)?;
        Ok(())
    }

    /// Record a failed upload cycle. The bound table is left as it was.
    pub fn report_failure(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn container(&self) -> &TabularContainer {
        &self.container
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn column_width(&self, column_id: &str) -> Option<u32> {
        self.column_widths.get(column_id).copied()
    }

    pub fn view(&self) -> TableView {
        let columns = self
            .container
            .columns()
            .iter()
            .map(|id| ColumnView {
                id: id.clone(),
                width: self.column_width(id),
            })
            .collect();

        let rows = self
            .container
            .rows()
            .iter()
            .map(|row| RowView {
                id: row.id(),
                cells: self
                    .container
                    .columns()
                    .iter()
                    .zip(self.container.row_values(row))
                    .map(|(column, value)| CellView {
                        row: row.id(),
                        column: column.clone(),
                        value: value.to_string(),
                    })
                    .collect(),
            })
            .collect();

        TableView {
            caption: self.caption.clone(),
            visible: self.visible,
            editable: self.editable,
            columns,
            rows,
            error: self.error.clone(),
            bound_at: self
                .bound_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::build_container_from_str;

    fn bound(text: &str) -> TablePresenter {
        let mut presenter = TablePresenter::new();
        presenter.bind(build_container_from_str(text).unwrap(), "data.csv");
        presenter
    }

    #[test]
    fn starts_hidden_read_only_and_empty() {
        let presenter = TablePresenter::new();
        assert!(!presenter.is_visible());
        assert!(!presenter.is_editable());
        assert!(presenter.container().is_empty());
        assert_eq!(presenter.caption(), None);
    }

    #[test]
    fn bind_shows_the_table_as_editable() {
        let presenter = bound("a,b\n1,2\n");
        assert!(presenter.is_visible());
        assert!(presenter.is_editable());
        assert_eq!(presenter.caption(), Some("data.csv"));
        assert_eq!(presenter.container().row_count(), 1);
    }

    #[test]
    fn header_click_sets_width_of_that_column_only() {
        let mut presenter = bound("a,b,c\n1,2,3\n");
        presenter.on_column_header_clicked("a").unwrap();

        assert_eq!(presenter.column_width("a"), Some(SELECTED_COLUMN_WIDTH));
        assert_eq!(presenter.column_width("b"), None);
        assert_eq!(presenter.column_width("c"), None);
    }

    #[test]
    fn header_click_is_idempotent() {
        let mut presenter = bound("a,b\n1,2\n");
        presenter.on_column_header_clicked("b").unwrap();
        let first = presenter.view();
        presenter.on_column_header_clicked("b").unwrap();
        presenter.on_column_header_clicked("b").unwrap();

        assert_eq!(presenter.column_width("b"), Some(777));
        assert_eq!(presenter.view().columns, first.columns);
    }

    #[test]
    fn header_click_on_unknown_column_changes_nothing() {
        let mut presenter = bound("a,b\n1,2\n");
        let err = presenter.on_column_header_clicked("zzz").unwrap_err();
        assert_eq!(
            err,
            PresenterError::Container(ContainerError::UnknownColumn("zzz".to_string()))
        );
        assert_eq!(presenter.column_width("zzz"), None);
    }

    #[test]
    fn rebinding_discards_previous_widths() {
        let mut presenter = bound("a,b\n1,2\n");
        presenter.on_column_header_clicked("a").unwrap();
        presenter.bind(build_container_from_str("a\n9\n").unwrap(), "next.csv");

        assert_eq!(presenter.column_width("a"), None);
        assert_eq!(presenter.caption(), Some("next.csv"));
        assert_eq!(presenter.container().columns(), ["a"]);
    }

    #[test]
    fn edit_requires_a_bound_table() {
        let mut presenter = TablePresenter::new();
        assert_eq!(
            presenter.edit_cell(RowId::from(1), "a", "x"),
            Err(PresenterError::NotEditable)
        );
    }

    #[test]
    fn edit_changes_the_cell() {
        let mut presenter = bound("a,b\n1,2\n3,4\n");
        presenter.edit_cell(RowId::from(2), "a", "changed").unwrap();
        assert_eq!(presenter.container().cell(RowId::from(2), "a"), Some("changed"));
        assert_eq!(presenter.container().cell(RowId::from(1), "a"), Some("1"));
    }

    #[test]
    fn failure_keeps_previous_table_and_bind_clears_it() {
        let mut presenter = bound("a\n1\n");
        presenter.report_failure("record 3 has 1 fields but the header declares 2");

        assert_eq!(presenter.error(), Some("record 3 has 1 fields but the header declares 2"));
        assert!(presenter.is_visible());
        assert_eq!(presenter.container().row_count(), 1);

        presenter.bind(build_container_from_str("b\n2\n").unwrap(), "ok.csv");
        assert_eq!(presenter.error(), None);
    }

    #[test]
    fn view_lists_cells_in_column_order() {
        let mut presenter = bound("a,b\n1,2\n3,4\n");
        presenter.on_column_header_clicked("a").unwrap();
        let view = presenter.view();

        assert_eq!(
            view.columns,
            vec![
                ColumnView { id: "a".into(), width: Some(777) },
                ColumnView { id: "b".into(), width: None },
            ]
        );
        let second: Vec<(&str, &str)> = view.rows[1]
            .cells
            .iter()
            .map(|c| (c.column.as_str(), c.value.as_str()))
            .collect();
        assert_eq!(second, vec![("a", "3"), ("b", "4")]);
        assert_eq!(view.rows[1].id, RowId::from(2));
        assert!(view.bound_at.is_some());
    }
}
