use super::{check_range, check_rows, Container, Rows, Shape, Storage};
use super::{FEATURES_NAME, FEATURE_WIDTH, LABELS_NAME, LABEL_WIDTH};
use crate::encoding::Bitboard;
use crate::error::{Error, Result};
use crate::outcome::Label;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

pub(crate) const MAGIC: [u8; 4] = *b"BBDS";
pub(crate) const VERSION: u16 = 1;
const NUM_ARRAYS: u16 = 2;
const NAME_LEN: usize = 16;

/// Offset of the committed row count
pub(crate) const ROWS_OFFSET: u64 = 4 + 2 + 2 + 2 * (NAME_LEN as u64 + 4);
/// Offset of the first row
pub(crate) const DATA_OFFSET: u64 = ROWS_OFFSET + 8;
/// Bytes per row: the feature row followed by its label
pub(crate) const ROW_STRIDE: usize = FEATURE_WIDTH + LABEL_WIDTH;

/// Containers stored as binary files on disk.
///
/// Layout (little endian):
/// magic `BBDS`, version u16, array count u16,
/// per array a zero-padded 16 byte name and a u32 width,
/// committed rows u64, then `rows` records of 773 feature bytes and 1 label byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStorage;

impl FileStorage {
    pub fn new() -> Self {
        FileStorage
    }
}

/// An open container file
pub struct FileContainer {
    file: File,
    rows: usize,
}

fn write_name(write: &mut impl Write, name: &str) -> io::Result<()> {
    let mut buffer = [0u8; NAME_LEN];
    buffer[..name.len()].copy_from_slice(name.as_bytes());
    write.write_all(&buffer)
}

fn write_header(write: &mut impl Write) -> io::Result<()> {
    write.write_all(&MAGIC)?;
    write.write_u16::<LittleEndian>(VERSION)?;
    write.write_u16::<LittleEndian>(NUM_ARRAYS)?;

    write_name(write, FEATURES_NAME)?;
    write.write_u32::<LittleEndian>(FEATURE_WIDTH as u32)?;
    write_name(write, LABELS_NAME)?;
    write.write_u32::<LittleEndian>(LABEL_WIDTH as u32)?;

    write.write_u64::<LittleEndian>(0)
}

/// Validates a header and returns the committed row count
pub(crate) fn parse_header(header: &[u8]) -> Result<usize> {
    if header.len() < DATA_OFFSET as usize {
        return Err(Error::Corrupted("header is truncated".to_string()));
    }

    let mut read = header;
    let mut magic = [0u8; 4];
    read.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(Error::Corrupted("bad magic".to_string()));
    }

    let version = read.read_u16::<LittleEndian>()?;
    if version != VERSION {
        return Err(Error::Corrupted(format!("unsupported version {}", version)));
    }

    let arrays = read.read_u16::<LittleEndian>()?;
    if arrays != NUM_ARRAYS {
        return Err(Error::Corrupted(format!("expected 2 arrays, found {}", arrays)));
    }

    for (name, width) in [(FEATURES_NAME, FEATURE_WIDTH), (LABELS_NAME, LABEL_WIDTH)] {
        let mut stored_name = [0u8; NAME_LEN];
        read.read_exact(&mut stored_name)?;
        let stored_width = read.read_u32::<LittleEndian>()? as usize;

        let stored_name = String::from_utf8_lossy(&stored_name);
        if stored_name.trim_end_matches('\0') != name || stored_width != width {
            return Err(Error::Corrupted(format!(
                "expected array {}[{}], found {}[{}]",
                name,
                width,
                stored_name.trim_end_matches('\0'),
                stored_width
            )));
        }
    }

    let rows = LittleEndian::read_u64(&header[ROWS_OFFSET as usize..DATA_OFFSET as usize]);
    usize::try_from(rows)
        .map_err(|_| Error::Corrupted(format!("row count {} does not fit in memory", rows)))
}

/// Checks that the data section holds at least `rows` records
pub(crate) fn check_length(rows: usize, file_length: u64) -> Result<()> {
    let needed = (rows as u64)
        .checked_mul(ROW_STRIDE as u64)
        .and_then(|data| data.checked_add(DATA_OFFSET));

    match needed {
        Some(needed) if needed <= file_length => Ok(()),
        Some(needed) => Err(Error::Corrupted(format!(
            "{} rows need {} bytes, file has {}",
            rows, needed, file_length
        ))),
        None => Err(Error::Corrupted(format!(
            "{} rows overflow the file size",
            rows
        ))),
    }
}

/// Splits raw records into rows, failing on bytes other than 0/1
pub(crate) fn decode_rows(data: &[u8]) -> Result<Rows> {
    let mut rows = Rows::with_capacity(data.len() / ROW_STRIDE);
    for record in data.chunks_exact(ROW_STRIDE) {
        let (features, label) = record.split_at(FEATURE_WIDTH);
        let features = Bitboard::from_slice(features)
            .ok_or_else(|| Error::Corrupted("feature row is not binary".to_string()))?;
        if label[0] > 1 {
            return Err(Error::Corrupted(format!("label {} is not binary", label[0])));
        }
        rows.push(features, label[0]);
    }
    Ok(rows)
}

fn map_open_error(err: io::Error, path: &Path) -> Error {
    match err.kind() {
        io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
        io::ErrorKind::AlreadyExists => Error::AlreadyExists(path.to_path_buf()),
        _ => Error::Io(err),
    }
}

impl Storage for FileStorage {
    type Container = FileContainer;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create(&self, path: &Path) -> Result<FileContainer> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| map_open_error(err, path))?;

        let mut writer = BufWriter::new(file);
        write_header(&mut writer)?;
        let file = writer.into_inner().map_err(|err| err.into_error())?;

        Ok(FileContainer { file, rows: 0 })
    }

    fn open(&self, path: &Path) -> Result<FileContainer> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|err| map_open_error(err, path))?;

        let mut header = vec![0u8; DATA_OFFSET as usize];
        file.read_exact(&mut header).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::Corrupted("header is truncated".to_string()),
            _ => Error::Io(err),
        })?;
        let rows = parse_header(&header)?;
        check_length(rows, file.metadata()?.len())?;

        Ok(FileContainer { file, rows })
    }

    fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|err| map_open_error(err, path))
    }
}

impl FileContainer {
    fn row_offset(row: usize) -> u64 {
        DATA_OFFSET + row as u64 * ROW_STRIDE as u64
    }
}

impl Container for FileContainer {
    fn shape(&self) -> Shape {
        Shape::with_rows(self.rows)
    }

    fn append(&mut self, features: &[Bitboard], labels: &[Label]) -> Result<()> {
        check_rows(features, labels)?;
        if features.is_empty() {
            return Ok(());
        }

        let mut data = Vec::with_capacity(features.len() * ROW_STRIDE);
        for (row, &label) in features.iter().zip(labels) {
            data.extend_from_slice(row.as_slice());
            data.push(label);
        }

        // rows first, then commit the new count
        self.file.seek(SeekFrom::Start(Self::row_offset(self.rows)))?;
        self.file.write_all(&data)?;

        let rows = self.rows + features.len();
        self.file.seek(SeekFrom::Start(ROWS_OFFSET))?;
        self.file.write_u64::<LittleEndian>(rows as u64)?;
        self.rows = rows;

        Ok(())
    }

    fn read_slice(&mut self, start: usize, count: usize) -> Result<Rows> {
        check_range(start, count, self.rows)?;

        let mut data = vec![0u8; count * ROW_STRIDE];
        self.file.seek(SeekFrom::Start(Self::row_offset(start)))?;
        self.file.read_exact(&mut data)?;

        decode_rows(&data)
    }

    fn close(mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}
