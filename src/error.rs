use crate::container::RowId;
use thiserror::Error;

/// Failure while turning CSV text into a [`TabularContainer`](crate::container::TabularContainer).
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// A data record does not have as many fields as the header record.
    ///
    /// `record` is the 1-based record number, the header being record 1.
    #[error("record {record} has {found} fields but the header declares {expected}")]
    MalformedRecord {
        record: usize,
        expected: usize,
        found: usize,
    },

    /// The underlying reader failed or the data was not valid CSV/UTF-8.
    #[error("failed to read CSV data: {0}")]
    Csv(#[from] csv::Error),
}

impl MaterializeError {
    pub fn is_malformed_record(&self) -> bool {
        matches!(self, MaterializeError::MalformedRecord { .. })
    }
}

/// Failure during one upload cycle (receive, store, parse).
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not allocate temporary upload storage: {0}")]
    TempStorage(#[source] std::io::Error),

    #[error("could not write upload data: {0}")]
    Write(#[source] std::io::Error),

    #[error("could not read back uploaded file: {0}")]
    Read(#[source] std::io::Error),

    #[error(transparent)]
    Malformed(#[from] MaterializeError),

    #[error("no file was provided in the upload")]
    MissingFile,

    #[error("invalid multipart upload: {0}")]
    Multipart(String),

    #[error("upload exceeds the size limit: {0}")]
    TooLarge(String),
}

/// Addressing errors on a bound container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    #[error("unknown row {0}")]
    UnknownRow(RowId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresenterError {
    #[error("the table is not editable")]
    NotEditable,

    #[error(transparent)]
    Container(#[from] ContainerError),
}
