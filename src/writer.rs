use crate::encoding::Bitboard;
use crate::error::{Error, Result};
use crate::outcome::Label;
use crate::storage::{Container, Rows, Shape, Storage};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_FLUSH_THRESHOLD: usize = 100;

fn check_threshold(flush_threshold: usize) -> Result<()> {
    if flush_threshold == 0 {
        return Err(Error::InvalidConfig(
            "flush threshold must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Buffers encoded rows in memory and appends them to a container in fixed-size chunks
pub struct DatasetWriter<S: Storage> {
    storage: S,
    path: PathBuf,
    flush_threshold: usize,

    /// Rows not yet on disk
    buffer: Rows,
    written: usize,
}

impl<S: Storage> DatasetWriter<S> {
    /// Creates a new container at `path`, failing if one already exists
    pub fn create<P: Into<PathBuf>>(storage: S, path: P, flush_threshold: usize) -> Result<Self> {
        check_threshold(flush_threshold)?;
        let path = path.into();
        storage.create(&path)?.close()?;
        Ok(Self::new(storage, path, flush_threshold, 0))
    }

    /// Appends to the existing container at `path`
    pub fn resume<P: Into<PathBuf>>(storage: S, path: P, flush_threshold: usize) -> Result<Self> {
        check_threshold(flush_threshold)?;
        let path = path.into();
        let rows = storage.shape(&path)?.rows;
        Ok(Self::new(storage, path, flush_threshold, rows))
    }

    fn new(storage: S, path: PathBuf, flush_threshold: usize, written: usize) -> Self {
        DatasetWriter {
            storage,
            path,
            flush_threshold,
            buffer: Rows::with_capacity(flush_threshold),
            written,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows in the container, excluding the buffer
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn push(&mut self, features: Bitboard, label: Label) -> Result<()> {
        self.buffer.push(features, label);
        self.flush_full_chunks()
    }

    pub fn extend(&mut self, rows: Rows) -> Result<()> {
        self.buffer.extend(rows);
        self.flush_full_chunks()
    }

    /// Writes every complete chunk and drops it from the front of the buffer
    fn flush_full_chunks(&mut self) -> Result<()> {
        while self.buffer.len() >= self.flush_threshold {
            self.write_prefix(self.flush_threshold)?;
        }
        Ok(())
    }

    fn write_prefix(&mut self, count: usize) -> Result<()> {
        let shape = self.storage.append(
            &self.path,
            &self.buffer.features[..count],
            &self.buffer.labels[..count],
        )?;

        self.buffer.features.drain(..count);
        self.buffer.labels.drain(..count);
        self.written = shape.rows;

        debug!(rows = count, total = self.written, path = %self.path.display(), "flushed");
        Ok(())
    }

    /// Writes whatever is still buffered, even less than a full chunk
    pub fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.write_prefix(self.buffer.len())?;
        }
        Ok(())
    }

    /// Flushes the remainder and returns the final shape of the container
    pub fn finish(mut self) -> Result<Shape> {
        self.flush()?;
        self.storage.shape(&self.path)
    }
}

impl<S: Storage> Drop for DatasetWriter<S> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            warn!(
                rows = self.buffer.len(),
                path = %self.path.display(),
                "dataset writer dropped with unflushed rows"
            );
        }
    }
}
