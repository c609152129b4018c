use crate::container::TabularContainer;
use crate::error::MaterializeError;
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;

/// Build a [`TabularContainer`] from CSV data
///
/// The first record declares the columns, in order. Every following record
/// becomes one row, joined to the columns by position. Fields are kept as
/// strings, untrimmed. Blank lines outside quoted fields are not records and
/// are skipped; they do not count towards record numbers.
///
/// # Arguments
/// * `reader` - Source of the CSV text
///
/// # Returns
/// * `Result<TabularContainer, MaterializeError>` - The container, or
///   `MalformedRecord` as soon as a record's field count differs from the
///   header's. No partial container is returned.
///
/// # Examples
/// ```
/// use csvgrid::loader::build_container;
///
/// let container = build_container("a,b\n1,2\n3,4\n".as_bytes()).unwrap();
/// assert_eq!(container.columns(), ["a", "b"]);
/// assert_eq!(container.row_count(), 2);
/// ```
pub fn build_container<R: Read>(reader: R) -> Result<TabularContainer, MaterializeError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut container = TabularContainer::new();
    let mut records = csv_reader.records();

    let header = match records.next() {
        Some(record) => record?,
        None => return Ok(container),
    };
    let positions = declare_columns(&mut container, &header);

    for (offset, record) in records.enumerate() {
        let record = record?;
        // header is record 1
        add_row(&mut container, &positions, &header, &record, offset + 2)?;
    }

    Ok(container)
}

/// Convenience wrapper for in-memory CSV text.
pub fn build_container_from_str(text: &str) -> Result<TabularContainer, MaterializeError> {
    build_container(text.as_bytes())
}

/// Declares the header's columns and returns, for each declared column, the
/// field index it is read from. A repeated name reads its last field.
fn declare_columns(container: &mut TabularContainer, header: &StringRecord) -> Vec<usize> {
    let mut positions: Vec<usize> = Vec::with_capacity(header.len());
    for (index, column) in header.iter().enumerate() {
        if container.add_column(column) {
            positions.push(index);
        } else {
            log::warn!("duplicate CSV column `{column}`; later fields overwrite earlier ones");
            if let Some(slot) = container
                .columns()
                .iter()
                .position(|c| c == column)
                .and_then(|slot| positions.get_mut(slot))
            {
                *slot = index;
            }
        }
    }
    positions
}

fn add_row(
    container: &mut TabularContainer,
    positions: &[usize],
    header: &StringRecord,
    record: &StringRecord,
    record_number: usize,
) -> Result<(), MaterializeError> {
    if header.len() != record.len() {
        return Err(MaterializeError::MalformedRecord {
            record: record_number,
            expected: header.len(),
            found: record.len(),
        });
    }

    container.push_row(positions.iter().map(|&i| record.get(i).unwrap_or_default()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_columns_and_rows_in_order() {
        let container = build_container_from_str("a,b\n1,2\n3,4\n").unwrap();
        assert_eq!(container.columns(), ["a", "b"]);

        let rows: Vec<Vec<&str>> = container
            .rows()
            .iter()
            .map(|row| container.row_values(row).collect())
            .collect();
        assert_eq!(rows, vec![vec!["1", "2"], vec!["3", "4"]]);

        let first = &container.rows()[0];
        assert_eq!(first.get("a"), Some("1"));
        assert_eq!(first.get("b"), Some("2"));
    }

    #[test]
    fn row_count_is_records_minus_header() {
        let text = "id,name,score\n1,ann,3\n2,bob,5\n3,cy,8\n4,di,1\n";
        let container = build_container_from_str(text).unwrap();
        assert_eq!(container.column_count(), 3);
        assert_eq!(container.row_count(), 4);
    }

    #[test]
    fn empty_input_gives_empty_container() {
        let container = build_container_from_str("").unwrap();
        assert_eq!(container.column_count(), 0);
        assert_eq!(container.row_count(), 0);
        assert!(container.is_empty());
    }

    #[test]
    fn header_only_gives_columns_without_rows() {
        let container = build_container_from_str("a,b,c\n").unwrap();
        assert_eq!(container.column_count(), 3);
        assert_eq!(container.row_count(), 0);
    }

    #[test]
    fn short_row_aborts_the_build() {
        let err = build_container_from_str("a,b\n1,2\n3\n5,6\n").unwrap_err();
        match err {
            MaterializeError::MalformedRecord {
                record,
                expected,
                found,
            } => {
                assert_eq!(record, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn long_row_aborts_the_build() {
        let err = build_container_from_str("a,b\n1,2,3\n").unwrap_err();
        assert!(err.is_malformed_record());
    }

    #[test]
    fn quoted_fields_keep_commas_quotes_and_newlines() {
        let text = "name,note\n\"Doe, Jane\",\"said \"\"hi\"\"\"\nx,\"two\nlines\"\n";
        let container = build_container_from_str(text).unwrap();
        let first = &container.rows()[0];
        assert_eq!(first.get("name"), Some("Doe, Jane"));
        assert_eq!(first.get("note"), Some("said \"hi\""));
        assert_eq!(container.rows()[1].get("note"), Some("two\nlines"));
    }

    #[test]
    fn fields_are_not_trimmed() {
        let container = build_container_from_str("a, b\n 1,2 \n").unwrap();
        assert_eq!(container.columns(), ["a", " b"]);
        assert_eq!(container.rows()[0].get("a"), Some(" 1"));
    }

    #[test]
    fn duplicate_headers_keep_the_last_field() {
        let container = build_container_from_str("a,b,a\n1,2,3\n").unwrap();
        assert_eq!(container.columns(), ["a", "b"]);
        assert_eq!(container.rows()[0].get("a"), Some("3"));
    }

    #[test]
    fn duplicate_headers_still_check_full_field_count() {
        let err = build_container_from_str("a,b,a\n1,2\n").unwrap_err();
        assert!(err.is_malformed_record());
    }

    #[test]
    fn blank_lines_between_records_are_skipped() {
        let container = build_container_from_str("a,b\n1,2\n\n3,4\n").unwrap();
        assert_eq!(container.row_count(), 2);
        assert_eq!(container.rows()[1].get("a"), Some("3"));
    }

    #[test]
    fn blank_lines_in_a_single_column_file_are_not_empty_rows() {
        let container = build_container_from_str("a\n1\n\n2\n\n").unwrap();
        let values: Vec<&str> = container
            .rows()
            .iter()
            .filter_map(|row| row.get("a"))
            .collect();
        assert_eq!(values, vec!["1", "2"]);
    }

    #[test]
    fn blank_lines_do_not_shift_record_numbers() {
        let err = build_container_from_str("a,b\n\n1,2\n3\n").unwrap_err();
        assert!(matches!(err, MaterializeError::MalformedRecord { record: 3, .. }));
    }

    #[test]
    fn empty_quoted_field_is_a_record() {
        let container = build_container_from_str("a\n\"\"\n").unwrap();
        assert_eq!(container.row_count(), 1);
        assert_eq!(container.rows()[0].get("a"), Some(""));
    }

    #[test]
    fn invalid_utf8_is_a_csv_error() {
        let bytes: &[u8] = b"a,b\n\xff\xfe,1\n";
        let err = build_container(bytes).unwrap_err();
        assert!(matches!(err, MaterializeError::Csv(_)));
    }
}
