use crate::error::{Error, Result};
use crate::storage::{Container, Rows, FEATURE_WIDTH, LABEL_WIDTH};
use rand::{seq::SliceRandom, Rng};

#[derive(Debug, Clone)]
pub struct BatchLoaderConfig {
    /// First row of the container served by this loader
    pub first: usize,
    /// Rows served, from `first`. `None` means until the end of the container
    pub size: Option<usize>,
    /// Number of samples in one batch
    pub batch_size: usize,
    /// Reorder rows randomly every epoch
    pub shuffle: bool,
}

impl Default for BatchLoaderConfig {
    fn default() -> Self {
        BatchLoaderConfig {
            first: 0,
            size: None,
            batch_size: 64,
            shuffle: true,
        }
    }
}

/// One batch, row-major: `features` is `rows × 773`, `labels` is `rows × 1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub features: Vec<u8>,
    pub labels: Vec<u8>,
    pub rows: usize,
}

impl Batch {
    fn from_rows(rows: Rows) -> Self {
        let mut features = Vec::with_capacity(rows.len() * FEATURE_WIDTH);
        for row in &rows.features {
            features.extend_from_slice(row.as_slice());
        }

        Batch {
            rows: rows.len(),
            features,
            labels: rows.labels,
        }
    }

    /// Features of `row`, `None` past the last row
    pub fn feature_row(&self, row: usize) -> Option<&[u8]> {
        self.features.chunks_exact(FEATURE_WIDTH).nth(row)
    }

    pub fn label(&self, row: usize) -> Option<u8> {
        self.labels.get(row * LABEL_WIDTH).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochState {
    /// Order computed, no batch served yet
    Ready,
    /// At least one batch of the current epoch was served
    Served,
}

/// Serves fixed-size batches of a container, epoch after epoch.
///
/// The number of rows is fixed when the loader is built; rows appended later are not seen.
/// The last partial batch of every epoch is dropped.
pub struct BatchLoader<C: Container, R: Rng> {
    container: C,
    rng: R,

    first: usize,
    size: usize,
    batch_size: usize,
    shuffle: bool,

    /// Row order of the current epoch, relative to `first`
    order: Vec<usize>,
    state: EpochState,
}

impl<C: Container, R: Rng> BatchLoader<C, R> {
    pub fn new(container: C, config: BatchLoaderConfig, rng: R) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(Error::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }

        let available = container.len();
        let size = config
            .size
            .unwrap_or_else(|| available.saturating_sub(config.first));

        match config.first.checked_add(size) {
            Some(end) if end <= available => {}
            _ => {
                return Err(Error::IndexOutOfRange {
                    index: config.first.saturating_add(size),
                    len: available,
                })
            }
        }

        let mut loader = BatchLoader {
            container,
            rng,
            first: config.first,
            size,
            batch_size: config.batch_size,
            shuffle: config.shuffle,
            order: Vec::new(),
            state: EpochState::Ready,
        };
        loader.on_epoch_end();

        Ok(loader)
    }

    /// Number of full batches per epoch
    pub fn len(&self) -> usize {
        self.size / self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rows covered by this loader, including the ones of the dropped partial batch
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn state(&self) -> EpochState {
        self.state
    }

    /// Row order of the current epoch, a permutation of `0..size`
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Reads batch `index` of the current epoch
    pub fn get_batch(&mut self, index: usize) -> Result<Batch> {
        if index >= self.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        self.state = EpochState::Served;

        let start = index * self.batch_size;
        let rows = if self.shuffle {
            let indices: Vec<usize> = self.order[start..start + self.batch_size]
                .iter()
                .map(|&i| self.first + i)
                .collect();
            self.container.read_rows(&indices)?
        } else {
            self.container
                .read_slice(self.first + start, self.batch_size)?
        };

        Ok(Batch::from_rows(rows))
    }

    /// Prepares the next epoch: a fresh permutation if shuffling, else the identity
    pub fn on_epoch_end(&mut self) {
        self.order = (0..self.size).collect();
        if self.shuffle {
            self.order.shuffle(&mut self.rng);
        }
        self.state = EpochState::Ready;
    }

    /// Iterates every batch of the current epoch
    pub fn epoch(&mut self) -> impl Iterator<Item = Result<Batch>> + '_ {
        (0..self.len()).map(move |index| self.get_batch(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::sample_rows;
    use crate::storage::{MemoryStorage, Storage};
    use rand::{rngs::StdRng, SeedableRng};
    use std::path::Path;

    fn loader(rows: usize, config: BatchLoaderConfig) -> Result<BatchLoader<impl Container, StdRng>> {
        let storage = MemoryStorage::new();
        let path = Path::new("batches.bin");
        let data = sample_rows(rows);
        storage.save(path, &data.features, &data.labels).unwrap();

        BatchLoader::new(storage.open(path).unwrap(), config, StdRng::seed_from_u64(42))
    }

    fn is_permutation(order: &[usize], size: usize) -> bool {
        let mut sorted = order.to_vec();
        sorted.sort();
        sorted == (0..size).collect::<Vec<_>>()
    }

    #[test]
    fn drops_the_partial_batch() {
        let loader = loader(250, BatchLoaderConfig::default()).unwrap();
        assert_eq!(loader.len(), 3);
        assert_eq!(loader.size(), 250);
    }

    #[test]
    fn sequential_batches() {
        let config = BatchLoaderConfig {
            batch_size: 4,
            shuffle: false,
            ..Default::default()
        };
        let mut loader = loader(10, config).unwrap();
        let expected = sample_rows(10);

        assert_eq!(loader.len(), 2);
        assert_eq!(loader.order(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

        let batch = loader.get_batch(1).unwrap();
        assert_eq!(batch.rows, 4);
        assert_eq!(batch.features.len(), 4 * 773);
        assert_eq!(batch.labels, vec![0, 1, 0, 1]);
        for row in 0..4 {
            assert_eq!(batch.feature_row(row), Some(expected.features[4 + row].as_slice()));
        }
        assert_eq!(batch.feature_row(4), None);
        assert_eq!(batch.label(4), None);

        // the order stays the same across epochs
        loader.on_epoch_end();
        assert_eq!(loader.get_batch(1).unwrap(), batch);
    }

    #[test]
    fn out_of_range_batches_fail() {
        let mut loader = loader(250, BatchLoaderConfig::default()).unwrap();

        assert!(loader.get_batch(2).is_ok());
        assert!(matches!(
            loader.get_batch(3),
            Err(Error::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn shuffles_every_epoch() {
        let mut loader = loader(250, BatchLoaderConfig::default()).unwrap();
        assert_eq!(loader.state(), EpochState::Ready);

        let first = loader.order().to_vec();
        loader.get_batch(0).unwrap();
        assert_eq!(loader.state(), EpochState::Served);

        loader.on_epoch_end();
        assert_eq!(loader.state(), EpochState::Ready);
        let second = loader.order().to_vec();

        assert!(is_permutation(&first, 250));
        assert!(is_permutation(&second, 250));
        assert_ne!(first, second);
    }

    #[test]
    fn labels_come_from_the_label_array() {
        let expected = sample_rows(64);
        let mut loader = loader(64, BatchLoaderConfig::default()).unwrap();

        let order = loader.order().to_vec();
        let batch = loader.get_batch(0).unwrap();

        assert_eq!(batch.labels.len(), 64);
        for (row, &index) in order.iter().enumerate() {
            assert_eq!(batch.label(row), Some(expected.labels[index]));
            assert_eq!(batch.feature_row(row), Some(expected.features[index].as_slice()));
        }
    }

    #[test]
    fn serves_a_window() {
        let config = BatchLoaderConfig {
            first: 6,
            size: Some(4),
            batch_size: 2,
            shuffle: false,
        };
        let expected = sample_rows(12);
        let mut loader = loader(12, config).unwrap();

        let batches: Vec<Batch> = loader.epoch().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].feature_row(1), Some(expected.features[9].as_slice()));
    }

    #[test]
    fn rejects_bad_configs() {
        let config = BatchLoaderConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(loader(10, config), Err(Error::InvalidConfig(_))));

        let config = BatchLoaderConfig {
            first: 8,
            size: Some(5),
            ..Default::default()
        };
        assert!(matches!(
            loader(10, config),
            Err(Error::IndexOutOfRange { index: 13, len: 10 })
        ));
    }
}
