//! Columnar file reader
//!
//! Opening a file reads and verifies only the header. Whole variables are
//! read on first request, verified against their checksum and cached. A
//! sub-block read seeks to the chunks that hold it and verifies only those,
//! so a lazily decoded node touches only its own elements.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::checksum::verify_checksum;
use super::errors::{ColumnarError, ColumnarResult};
use super::file::ColumnarFile;
use super::record::{
    decode_block, decode_header, BlockRef, CHUNK_BYTES, FORMAT_VERSION, MAGIC, PREAMBLE_LEN,
};
use super::store::{block_range, element_count, VariableStore};
use super::variable::{VariableData, VariableHeader};
use crate::observability::{log_event, Event};
use crate::schema::DdVersion;

struct Entry {
    header: VariableHeader,
    block: BlockRef,
}

/// Reads variables from a columnar file on disk
pub struct ColumnarReader {
    path: PathBuf,
    reader: RefCell<BufReader<File>>,
    /// Byte offset of the first data block
    data_start: u64,
    file_size: u64,
    dataset: String,
    version: DdVersion,
    created: DateTime<Utc>,
    dimensions: BTreeMap<String, usize>,
    entries: BTreeMap<String, Entry>,
    cache: RefCell<HashMap<String, Arc<VariableData>>>,
}

impl ColumnarReader {
    /// Opens `path` and verifies its header
    pub fn open(path: &Path) -> ColumnarResult<Self> {
        let file = File::open(path).map_err(|e| {
            ColumnarError::read_failed(
                format!("Failed to open columnar file: {}", path.display()),
                e,
            )
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| ColumnarError::read_failed("Failed to read file metadata", e))?
            .len();
        let mut reader = BufReader::new(file);

        let mut preamble = [0u8; PREAMBLE_LEN as usize];
        reader.read_exact(&mut preamble).map_err(|_| {
            ColumnarError::unsupported_format(format!("Not a columnar file: {}", path.display()))
        })?;
        if &preamble[..4] != MAGIC {
            return Err(ColumnarError::unsupported_format(format!(
                "Not a columnar file: {}",
                path.display()
            )));
        }
        let version = u32::from_le_bytes([preamble[4], preamble[5], preamble[6], preamble[7]]);
        if version != FORMAT_VERSION {
            return Err(ColumnarError::unsupported_format(format!(
                "Unsupported format version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).map_err(|e| {
            ColumnarError::corruption_at_offset(
                PREAMBLE_LEN,
                format!("Failed to read header length: {}", e),
            )
        })?;
        let record_length = u32::from_le_bytes(len_buf) as u64;
        if record_length < 8 || PREAMBLE_LEN + record_length > file_size {
            return Err(ColumnarError::corruption_at_offset(
                PREAMBLE_LEN,
                format!(
                    "Header length {} does not fit a file of {} bytes",
                    record_length, file_size
                ),
            ));
        }

        let mut record = vec![0u8; record_length as usize];
        record[..4].copy_from_slice(&len_buf);
        reader.read_exact(&mut record[4..]).map_err(|e| {
            ColumnarError::corruption_at_offset(PREAMBLE_LEN, format!("Failed to read header: {}", e))
        })?;
        let (header, consumed) = decode_header(&record).map_err(|e| {
            let display = path.display().to_string();
            log_event(Event::ColumnarCorruption, &[("path", display.as_str()), ("block", "header")]);
            ColumnarError::corruption_at_offset(PREAMBLE_LEN, e.to_string())
        })?;

        let entries = header
            .variables
            .into_iter()
            .map(|v| {
                (
                    v.header.name.clone(),
                    Entry {
                        header: v.header,
                        block: v.block,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();

        let display = path.display().to_string();
        let count = entries.len().to_string();
        let version_str = header.dd_version.to_string();
        log_event(
            Event::ColumnarOpened,
            &[
                ("path", display.as_str()),
                ("dataset", header.dataset.as_str()),
                ("dd_version", version_str.as_str()),
                ("variables", count.as_str()),
            ],
        );

        Ok(Self {
            path: path.to_path_buf(),
            reader: RefCell::new(reader),
            data_start: PREAMBLE_LEN + consumed as u64,
            file_size,
            dataset: header.dataset,
            version: header.dd_version,
            created: header.created,
            dimensions: header.dimensions,
            entries,
            cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Number of variables read so far
    pub fn cached_count(&self) -> usize {
        self.cache.borrow().len()
    }

    fn corrupted(&self, name: &str, reason: impl Into<String>) -> ColumnarError {
        let display = self.path.display().to_string();
        log_event(Event::ColumnarCorruption, &[("path", display.as_str()), ("block", name)]);
        ColumnarError::corruption_for_variable(name, reason)
    }

    /// Absolute file offset of `block`, checked against the file size
    fn locate(&self, name: &str, block: &BlockRef) -> ColumnarResult<u64> {
        let start = self.data_start.checked_add(block.offset);
        let end = start.and_then(|s| s.checked_add(block.length));
        match (start, end) {
            (Some(start), Some(end)) if end <= self.file_size => Ok(start),
            _ => Err(ColumnarError::corruption_for_variable(
                name,
                format!(
                    "Block at offset {} with length {} exceeds file size {}",
                    block.offset, block.length, self.file_size
                ),
            )),
        }
    }

    fn read_bytes(&self, name: &str, start: u64, length: u64) -> ColumnarResult<Vec<u8>> {
        let length = usize::try_from(length).map_err(|_| {
            ColumnarError::corruption_for_variable(name, format!("Block length {} is too large", length))
        })?;
        let mut bytes = vec![0u8; length];
        let mut reader = self.reader.borrow_mut();
        reader
            .seek(SeekFrom::Start(start))
            .map_err(|e| ColumnarError::read_failed(format!("Failed to seek to {}", name), e))?;
        reader.read_exact(&mut bytes).map_err(|e| {
            ColumnarError::corruption_for_variable(name, format!("Failed to read block: {}", e))
        })?;
        Ok(bytes)
    }

    fn read_whole(&self, name: &str, entry: &Entry) -> ColumnarResult<VariableData> {
        let start = self.locate(name, &entry.block)?;
        let bytes = self.read_bytes(name, start, entry.block.length)?;
        if !verify_checksum(&bytes, entry.block.checksum) {
            return Err(self.corrupted(name, "Checksum mismatch"));
        }

        let count = element_count(name, &self.shape(name)?)?;
        decode_block(entry.header.dtype, count, &bytes)
            .map_err(|e| ColumnarError::corruption_for_variable(name, e.to_string()))
    }

    /// Reads elements `range` of a fixed-width block, verifying only the
    /// chunks they fall in
    fn read_range(
        &self,
        name: &str,
        entry: &Entry,
        width: usize,
        range: Range<usize>,
    ) -> ColumnarResult<VariableData> {
        let block = &entry.block;
        let block_start = self.locate(name, block)?;
        if block.chunks.len() as u64 != block.length.div_ceil(CHUNK_BYTES) {
            return Err(self.corrupted(
                name,
                format!("{} chunk checksums for {} bytes", block.chunks.len(), block.length),
            ));
        }

        let (first, last) = match (range.start.checked_mul(width), range.end.checked_mul(width)) {
            (Some(a), Some(b)) if b as u64 <= block.length => (a as u64, b as u64),
            _ => {
                return Err(ColumnarError::corruption_for_variable(
                    name,
                    format!("Elements {:?} exceed block length {}", range, block.length),
                ))
            }
        };
        if first == last {
            return decode_block(entry.header.dtype, 0, &[])
                .map_err(|e| ColumnarError::corruption_for_variable(name, e.to_string()));
        }

        let first_chunk = first / CHUNK_BYTES;
        let chunk_start = first_chunk * CHUNK_BYTES;
        let chunk_end = (last.div_ceil(CHUNK_BYTES) * CHUNK_BYTES).min(block.length);
        let bytes = self.read_bytes(name, block_start + chunk_start, chunk_end - chunk_start)?;
        for (i, chunk) in bytes.chunks(CHUNK_BYTES as usize).enumerate() {
            let chunk_index = first_chunk as usize + i;
            if !verify_checksum(chunk, block.chunks[chunk_index]) {
                return Err(self.corrupted(name, format!("Checksum mismatch in chunk {}", chunk_index)));
            }
        }

        let local = (first - chunk_start) as usize..(last - chunk_start) as usize;
        decode_block(entry.header.dtype, range.len(), &bytes[local])
            .map_err(|e| ColumnarError::corruption_for_variable(name, e.to_string()))
    }

    /// Reads every variable into memory
    pub fn load(&self) -> ColumnarResult<ColumnarFile> {
        let mut file = ColumnarFile::with_created(self.dataset.as_str(), self.version, self.created);
        for (name, &size) in &self.dimensions {
            file.add_dimension(name, size)?;
        }
        for (name, entry) in &self.entries {
            file.insert_unchecked(entry.header.clone(), self.read(name)?);
        }
        Ok(file)
    }
}

impl VariableStore for ColumnarReader {
    fn dataset(&self) -> &str {
        &self.dataset
    }

    fn version(&self) -> DdVersion {
        self.version
    }

    fn dimension(&self, name: &str) -> Option<usize> {
        self.dimensions.get(name).copied()
    }

    fn variable_names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    fn header(&self, name: &str) -> Option<&VariableHeader> {
        self.entries.get(name).map(|e| &e.header)
    }

    fn read(&self, name: &str) -> ColumnarResult<Arc<VariableData>> {
        if let Some(data) = self.cache.borrow().get(name) {
            return Ok(Arc::clone(data));
        }
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ColumnarError::unknown_variable(name))?;
        let data = Arc::new(self.read_whole(name, entry)?);
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Arc::clone(&data));
        Ok(data)
    }

    fn read_block(&self, name: &str, prefix: &[usize]) -> ColumnarResult<VariableData> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ColumnarError::unknown_variable(name))?;
        let range = block_range(name, &self.shape(name)?, prefix)?;

        let cached = self.cache.borrow().get(name).cloned();
        let data = match (cached, entry.header.dtype.width()) {
            (Some(data), _) => data,
            (None, Some(width)) if !entry.block.chunks.is_empty() => {
                return self.read_range(name, entry, width, range);
            }
            // strings have no fixed stride to seek by
            (None, _) => self.read(name)?,
        };
        data.slice(range.clone()).ok_or_else(|| {
            ColumnarError::corruption_for_variable(
                name,
                format!("holds {} elements, block needs {:?}", data.len(), range),
            )
        })
    }
}
