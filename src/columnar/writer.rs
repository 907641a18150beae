//! Columnar file writer
//!
//! A file is written in one pass and fsynced before `write` returns. An
//! existing file at the target path is replaced.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::errors::{ColumnarError, ColumnarResult};
use super::file::ColumnarFile;
use super::record::{encode_block, encode_header, encode_preamble, BlockRef, FileHeader, StoredVariable};
use super::store::VariableStore;
use crate::observability::{log_event, Event};

/// Writes [`ColumnarFile`]s to one path
pub struct ColumnarWriter {
    path: PathBuf,
}

impl ColumnarWriter {
    /// Prepares writing to `path`, creating missing parent directories
    pub fn create(path: &Path) -> ColumnarResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    ColumnarError::write_failed(
                        format!("Failed to create directory: {}", parent.display()),
                        e,
                    )
                })?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `file` and syncs it to disk.
    ///
    /// Returns the number of bytes written.
    pub fn write(&self, file: &ColumnarFile) -> ColumnarResult<u64> {
        let mut blocks = Vec::with_capacity(file.len());
        let mut variables = Vec::with_capacity(file.len());
        let mut offset = 0u64;
        for variable in file.variables() {
            let block = encode_block(&variable.data);
            let block_ref = BlockRef::new(offset, variable.header.dtype, &block);
            offset += block_ref.length;
            variables.push(StoredVariable {
                header: variable.header.clone(),
                block: block_ref,
            });
            blocks.push(block);
        }

        let header = FileHeader {
            dataset: file.dataset().to_string(),
            dd_version: file.version(),
            created: file.created(),
            dimensions: file.dimensions().clone(),
            variables,
        };
        let header = encode_header(&header).map_err(|e| {
            ColumnarError::write_failed("Failed to serialize file header", e)
        })?;

        let handle = File::create(&self.path).map_err(|e| {
            ColumnarError::write_failed(
                format!("Failed to create columnar file: {}", self.path.display()),
                e,
            )
        })?;
        let mut out = BufWriter::new(handle);

        let write_err = |e| {
            ColumnarError::write_failed(
                format!("Failed to write columnar file: {}", self.path.display()),
                e,
            )
        };
        out.write_all(&encode_preamble()).map_err(write_err)?;
        out.write_all(&header).map_err(write_err)?;
        for block in &blocks {
            out.write_all(block).map_err(write_err)?;
        }

        let handle = out
            .into_inner()
            .map_err(|e| write_err(e.into_error()))?;
        // fsync - the file is complete only once it is durable
        handle.sync_all().map_err(|e| {
            ColumnarError::write_failed(
                format!("fsync failed for columnar file: {}", self.path.display()),
                e,
            )
        })?;

        let total = super::record::PREAMBLE_LEN + header.len() as u64 + offset;
        let path = self.path.display().to_string();
        let count = file.len().to_string();
        let bytes = total.to_string();
        log_event(
            Event::ColumnarWritten,
            &[
                ("path", path.as_str()),
                ("dataset", file.dataset()),
                ("variables", count.as_str()),
                ("bytes", bytes.as_str()),
            ],
        );
        Ok(total)
    }
}
