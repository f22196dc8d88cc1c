use super::file::{check_length, decode_rows, parse_header, DATA_OFFSET, ROW_STRIDE};
use super::{check_range, Container, Rows, Shape};
use crate::encoding::Bitboard;
use crate::error::{Error, Result};
use crate::outcome::Label;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io;
use std::path::Path;

/// Read-only view of a finalized container file, mapped into memory.
///
/// The row count is read once when mapping; the file must not be written while mapped.
pub struct MappedContainer {
    mmap: Mmap,
    rows: usize,
}

impl MappedContainer {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::Io(err),
        })?;

        let length = file.metadata()?.len();
        if length < DATA_OFFSET {
            return Err(Error::Corrupted("header is truncated".to_string()));
        }

        // SAFETY: single writer contract, nobody resizes the file while it is mapped
        let mmap = unsafe { MmapOptions::new().map(&file)? };

        let rows = parse_header(&mmap)?;
        check_length(rows, length)?;

        Ok(MappedContainer { mmap, rows })
    }

    fn records(&self, start: usize, count: usize) -> &[u8] {
        let begin = DATA_OFFSET as usize + start * ROW_STRIDE;
        &self.mmap[begin..begin + count * ROW_STRIDE]
    }
}

impl Container for MappedContainer {
    fn shape(&self) -> Shape {
        Shape::with_rows(self.rows)
    }

    fn append(&mut self, _features: &[Bitboard], _labels: &[Label]) -> Result<()> {
        Err(Error::ReadOnly)
    }

    fn read_slice(&mut self, start: usize, count: usize) -> Result<Rows> {
        check_range(start, count, self.rows)?;
        decode_rows(self.records(start, count))
    }

    fn read_rows(&mut self, indices: &[usize]) -> Result<Rows> {
        let mut rows = Rows::with_capacity(indices.len());
        for &index in indices {
            check_range(index, 1, self.rows)?;
            rows.extend(decode_rows(self.records(index, 1))?);
        }
        Ok(rows)
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::sample_rows;
    use crate::storage::{FileStorage, Storage};

    #[test]
    fn reads_what_the_file_storage_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.bin");
        let rows = sample_rows(9);
        FileStorage.save(&path, &rows.features, &rows.labels).unwrap();

        let mut mapped = MappedContainer::open(&path).unwrap();
        assert_eq!(mapped.shape(), Shape::with_rows(9));
        assert_eq!(mapped.read_slice(0, 9).unwrap(), rows);
        assert_eq!(mapped.read_rows(&[8, 3]).unwrap().labels, vec![0, 1]);
        assert!(matches!(
            mapped.read_rows(&[1, 9]),
            Err(Error::IndexOutOfRange { index: 9, len: 9 })
        ));
        assert!(matches!(
            mapped.append(&rows.features, &rows.labels),
            Err(Error::ReadOnly)
        ));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            MappedContainer::open(dir.path().join("nope.bin")),
            Err(Error::NotFound(_))
        ));
    }
}
