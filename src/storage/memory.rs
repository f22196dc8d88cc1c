use super::{check_range, check_rows, Container, Rows, Shape, Storage};
use crate::encoding::Bitboard;
use crate::error::{Error, Result};
use crate::outcome::Label;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

type SharedRows = Rc<RefCell<Rows>>;

/// Containers kept in memory, keyed by path. Clones share the same containers
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    containers: Rc<RefCell<HashMap<PathBuf, SharedRows>>>,
    appends: Rc<RefCell<Vec<usize>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row counts of every append made so far, in order
    pub fn appends(&self) -> Vec<usize> {
        self.appends.borrow().clone()
    }
}

/// A handle on an in-memory container
pub struct MemoryContainer {
    rows: SharedRows,
    appends: Rc<RefCell<Vec<usize>>>,
}

impl Storage for MemoryStorage {
    type Container = MemoryContainer;

    fn exists(&self, path: &Path) -> bool {
        self.containers.borrow().contains_key(path)
    }

    fn create(&self, path: &Path) -> Result<MemoryContainer> {
        let mut containers = self.containers.borrow_mut();
        if containers.contains_key(path) {
            return Err(Error::AlreadyExists(path.to_path_buf()));
        }

        let rows = SharedRows::default();
        containers.insert(path.to_path_buf(), rows.clone());

        Ok(MemoryContainer {
            rows,
            appends: self.appends.clone(),
        })
    }

    fn open(&self, path: &Path) -> Result<MemoryContainer> {
        let rows = self
            .containers
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_path_buf()))?;

        Ok(MemoryContainer {
            rows,
            appends: self.appends.clone(),
        })
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.containers
            .borrow_mut()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(path.to_path_buf()))
    }
}

impl Container for MemoryContainer {
    fn shape(&self) -> Shape {
        Shape::with_rows(self.rows.borrow().len())
    }

    fn append(&mut self, features: &[Bitboard], labels: &[Label]) -> Result<()> {
        check_rows(features, labels)?;

        let mut rows = self.rows.borrow_mut();
        rows.features.extend_from_slice(features);
        rows.labels.extend_from_slice(labels);
        self.appends.borrow_mut().push(features.len());

        Ok(())
    }

    fn read_slice(&mut self, start: usize, count: usize) -> Result<Rows> {
        let rows = self.rows.borrow();
        check_range(start, count, rows.len())?;

        Ok(Rows {
            features: rows.features[start..start + count].to_vec(),
            labels: rows.labels[start..start + count].to_vec(),
        })
    }

    fn close(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::storage_contract;

    #[test]
    fn contract() {
        storage_contract(&MemoryStorage::new(), Path::new("memory/dataset.bin"));
    }

    #[test]
    fn clones_share_containers() {
        let storage = MemoryStorage::new();
        let path = Path::new("shared.bin");
        storage.clone().create(path).unwrap().close().unwrap();

        assert!(storage.exists(path));
    }
}
