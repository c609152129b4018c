use crate::container::TabularContainer;
use crate::error::UploadError;
use crate::loader;
use log::{debug, warn};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Allocates the temporary files uploads are streamed into.
#[derive(Clone, Debug)]
pub struct UploadReceiver {
    temp_dir: PathBuf,
}

impl Default for UploadReceiver {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl UploadReceiver {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Start an upload cycle
    ///
    /// Creates a fresh temporary file owned by the returned handle. The
    /// extension of `filename` is not enforced.
    ///
    /// # Returns
    /// * `Result<UploadHandle, UploadError>` - The handle, or `TempStorage` if
    ///   the temporary file could not be created
    pub fn open(&self, filename: &str, mime_type: &str) -> Result<UploadHandle, UploadError> {
        if !filename.to_ascii_lowercase().ends_with(".csv") {
            warn!("upload `{filename}` ({mime_type}) does not have a .csv extension");
        }

        let file = tempfile::Builder::new()
            .prefix("temp")
            .suffix(".csv")
            .tempfile_in(&self.temp_dir)
            .map_err(UploadError::TempStorage)?;
        debug!("receiving `{filename}` into {}", file.path().display());

        Ok(UploadHandle {
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            file,
            bytes_written: 0,
        })
    }
}

/// An in-flight upload. Dropping the handle deletes its temporary file.
#[derive(Debug)]
pub struct UploadHandle {
    filename: String,
    mime_type: String,
    file: NamedTempFile,
    bytes_written: u64,
}

/// Result of a successful upload cycle.
#[derive(Debug)]
pub struct CompletedUpload {
    pub filename: String,
    pub container: TabularContainer,
}

impl UploadHandle {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Location of the temporary file backing this upload.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Append the next chunk of uploaded data.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), UploadError> {
        self.file.write_all(bytes).map_err(UploadError::Write)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Finish the upload cycle
    ///
    /// Reads the temporary file back, materializes it into a container and
    /// removes the file. The file is removed on failure as well.
    ///
    /// # Returns
    /// * `Result<CompletedUpload, UploadError>` - The parsed upload, `Read` if
    ///   the file could not be read back, or `Malformed` if the CSV was rejected
    pub fn complete(mut self) -> Result<CompletedUpload, UploadError> {
        self.file.flush().map_err(UploadError::Write)?;

        let reader = self.file.reopen().map_err(UploadError::Read)?;
        let container = loader::build_container(BufReader::new(reader))?;
        debug!(
            "`{}` ({}): {} bytes, {} columns, {} rows",
            self.filename,
            self.mime_type(),
            self.bytes_written,
            container.column_count(),
            container.row_count()
        );

        if let Err(e) = self.file.close() {
            warn!("could not remove temporary file for `{}`: {e}", self.filename);
        }

        Ok(CompletedUpload {
            filename: self.filename,
            container,
        })
    }
}
