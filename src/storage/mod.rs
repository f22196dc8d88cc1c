mod file;
mod mapped;
mod memory;

pub use file::{FileContainer, FileStorage};
pub use mapped::MappedContainer;
pub use memory::{MemoryContainer, MemoryStorage};

use crate::encoding::{Bitboard, BITBOARD_SIZE};
use crate::error::{Error, Result};
use crate::outcome::Label;
use std::path::Path;

/// Name of the feature array inside a container
pub const FEATURES_NAME: &str = "bitboards";
/// Name of the label array inside a container
pub const LABELS_NAME: &str = "labels";

pub const FEATURE_WIDTH: usize = BITBOARD_SIZE;
pub const LABEL_WIDTH: usize = 1;

/// Row count and row widths of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub rows: usize,
    pub feature_width: usize,
    pub label_width: usize,
}

impl Shape {
    pub fn with_rows(rows: usize) -> Self {
        Shape {
            rows,
            feature_width: FEATURE_WIDTH,
            label_width: LABEL_WIDTH,
        }
    }
}

/// Rows read from a container, features and labels index-aligned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rows {
    pub features: Vec<Bitboard>,
    pub labels: Vec<Label>,
}

impl Rows {
    pub fn with_capacity(capacity: usize) -> Self {
        Rows {
            features: Vec::with_capacity(capacity),
            labels: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, features: Bitboard, label: Label) {
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn extend(&mut self, other: Rows) {
        self.features.extend(other.features);
        self.labels.extend(other.labels);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Fails unless both arrays grow by the same number of rows and every label is 0 or 1
pub fn check_rows(features: &[Bitboard], labels: &[Label]) -> Result<()> {
    if features.len() != labels.len() {
        return Err(Error::ShapeMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    if let Some(&label) = labels.iter().find(|&&label| label > 1) {
        return Err(Error::InvalidLabel(label));
    }
    Ok(())
}

/// Fails if `[start, start + count)` is not inside `len` rows
pub fn check_range(start: usize, count: usize, len: usize) -> Result<()> {
    match start.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::IndexOutOfRange {
            index: start.saturating_add(count.saturating_sub(1)),
            len,
        }),
    }
}

/// An open container: two growable, row-aligned arrays
/// (`bitboards` of width 773, `labels` of width 1)
pub trait Container {
    fn shape(&self) -> Shape;

    fn len(&self) -> usize {
        self.shape().rows
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grows both arrays by the same number of rows.
    /// Nothing is written if the row counts differ or a label is not 0/1.
    fn append(&mut self, features: &[Bitboard], labels: &[Label]) -> Result<()>;

    /// Reads `count` consecutive rows starting at `start`
    fn read_slice(&mut self, start: usize, count: usize) -> Result<Rows>;

    /// Gathers rows by index, in the given order
    fn read_rows(&mut self, indices: &[usize]) -> Result<Rows> {
        let mut rows = Rows::with_capacity(indices.len());
        for &index in indices {
            rows.extend(self.read_slice(index, 1)?);
        }
        Ok(rows)
    }

    /// Releases the container, surfacing any pending write error
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Where containers live. Every path-level operation opens and closes its container
pub trait Storage {
    type Container: Container;

    fn exists(&self, path: &Path) -> bool;

    /// Creates an empty container, refusing to replace anything at `path`
    fn create(&self, path: &Path) -> Result<Self::Container>;

    /// Opens an existing container for reading and appending
    fn open(&self, path: &Path) -> Result<Self::Container>;

    fn remove(&self, path: &Path) -> Result<()>;

    /// Appends rows to the container at `path` and returns its new shape
    fn append(&self, path: &Path, features: &[Bitboard], labels: &[Label]) -> Result<Shape> {
        check_rows(features, labels)?;

        let mut container = self.open(path)?;
        container.append(features, labels)?;
        let shape = container.shape();
        container.close()?;

        Ok(shape)
    }

    /// Replaces (or creates) the container at `path` with exactly these rows
    fn save(&self, path: &Path, features: &[Bitboard], labels: &[Label]) -> Result<Shape> {
        check_rows(features, labels)?;

        if self.exists(path) {
            self.remove(path)?;
        }

        let mut container = self.create(path)?;
        container.append(features, labels)?;
        let shape = container.shape();
        container.close()?;

        Ok(shape)
    }

    fn shape(&self, path: &Path) -> Result<Shape> {
        let container = self.open(path)?;
        let shape = container.shape();
        container.close()?;
        Ok(shape)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::encoding::encode;

    pub fn sample_rows(n: usize) -> Rows {
        let fens = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
            "8/8/8/8/8/8/8/4K2k b - - 0 1",
            "r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1",
        ];

        let mut rows = Rows::default();
        for i in 0..n {
            rows.push(encode(fens[i % fens.len()]).unwrap(), (i % 2) as Label);
        }
        rows
    }

    /// Behaviour every storage must share
    pub fn storage_contract<S: Storage>(storage: &S, path: &Path) {
        assert!(!storage.exists(path));

        storage.create(path).unwrap().close().unwrap();
        assert!(storage.exists(path));
        assert_eq!(storage.shape(path).unwrap(), Shape::with_rows(0));

        // never replaces an existing container
        assert!(matches!(storage.create(path), Err(Error::AlreadyExists(_))));

        // appends accumulate
        let first = sample_rows(5);
        let second = sample_rows(7);
        assert_eq!(
            storage.append(path, &first.features, &first.labels).unwrap(),
            Shape::with_rows(5)
        );
        assert_eq!(
            storage.append(path, &second.features, &second.labels).unwrap(),
            Shape::with_rows(12)
        );

        // mismatched rows write nothing
        let err = storage.append(path, &first.features, &first.labels[..2]);
        assert!(matches!(
            err,
            Err(Error::ShapeMismatch {
                features: 5,
                labels: 2
            })
        ));
        assert_eq!(storage.shape(path).unwrap().rows, 12);

        // so do labels outside 0/1
        let err = storage.append(path, &first.features[..1], &[2]);
        assert!(matches!(err, Err(Error::InvalidLabel(2))));
        assert_eq!(storage.shape(path).unwrap().rows, 12);

        // read back in written order
        let mut expected = first.clone();
        expected.extend(second);
        let mut container = storage.open(path).unwrap();
        assert_eq!(container.read_slice(0, 12).unwrap(), expected);
        assert_eq!(container.read_slice(5, 2).unwrap().labels, vec![0, 1]);
        assert_eq!(
            container.read_rows(&[11, 0]).unwrap().features,
            vec![expected.features[11].clone(), expected.features[0].clone()]
        );
        assert!(matches!(
            container.read_slice(10, 3),
            Err(Error::IndexOutOfRange { index: 12, len: 12 })
        ));
        container.close().unwrap();

        // save replaces everything
        let saved = sample_rows(3);
        storage.save(path, &saved.features, &saved.labels).unwrap();
        let mut container = storage.open(path).unwrap();
        assert_eq!(container.len(), 3);
        assert_eq!(container.read_slice(0, 3).unwrap(), saved);
        container.close().unwrap();

        storage.remove(path).unwrap();
        assert!(!storage.exists(path));
        assert!(matches!(storage.open(path), Err(Error::NotFound(_))));
    }

    #[test]
    fn range_checks() {
        assert!(check_range(0, 0, 0).is_ok());
        assert!(check_range(3, 2, 5).is_ok());
        assert!(matches!(
            check_range(4, 2, 5),
            Err(Error::IndexOutOfRange { index: 5, len: 5 })
        ));
        assert!(check_range(usize::MAX, 2, 5).is_err());
    }
}
