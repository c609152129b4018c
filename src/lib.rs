/*!
# csvgrid

A small web application that turns an uploaded CSV file into an editable
table, plus a plain-text ping endpoint.

## Overview

A browser uploads a CSV file. The bytes are streamed into a temporary file,
parsed into an in-memory table and bound to the caller's session. The page
then shows the table; clicking a column header widens that column and every
cell can be edited in place.

## Upload cycle

1. **Receive** - [`upload::UploadReceiver::open`] allocates a temporary file,
   [`upload::UploadHandle::write`] appends each chunk of the upload.
2. **Materialize** - [`upload::UploadHandle::complete`] reads the file back
   through [`loader::build_container`] and removes it.
3. **Present** - [`presenter::TablePresenter::bind`] makes the new
   [`container::TabularContainer`] the visible, editable data source.

Failures at any step are returned to the caller and shown on the page; the
previously bound table stays in place.

## CSV rules

- The first record names the columns; every column holds strings.
- Each following record is one row, matched to the columns by position.
- A record with a different field count than the header rejects the whole
  file.
- An empty file gives an empty table.

## Modules

- **container**: ordered columns and rows of string cells
- **loader**: CSV to container
- **upload**: temporary-file upload handles
- **presenter**: table state (visibility, editability, column widths)
- **config**: server settings from env and arguments
- **app**: routes and handlers (`web` feature)
- **session**: per-browser state keyed by cookie (`web` feature)
- **greeting**: the `GET /abc` ping (`web` feature)

## HTTP Endpoints

- `GET /` - Upload form and the session's table
- `GET /abc` - Fixed greeting, `text/plain`
- `POST /upload` - Multipart upload, file field `file`
- `POST /columns/select` - Column header click (`column`)
- `POST /cells` - Cell edit (`row`, `column`, `value`)
- `GET /api/table` - The session's table as JSON
*/

pub mod config;
pub mod container;
pub mod error;
pub mod loader;
pub mod presenter;
pub mod upload;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod greeting;
#[cfg(feature = "web")]
pub mod session;

pub use container::{Row, RowId, TabularContainer};
pub use error::{ContainerError, MaterializeError, PresenterError, UploadError};
pub use loader::build_container;
pub use presenter::{SELECTED_COLUMN_WIDTH, TablePresenter, TableView};
pub use upload::{CompletedUpload, UploadHandle, UploadReceiver};
