use std::{fs, iter::FusedIterator, path::Path};

use log::debug;
use structures::PixelRecord;

use crate::{
    constants::{record_config, RECORD_WIDTH},
    errors::HistoryError,
};

/// A complete history of pixel placements held in memory.
///
/// The buffer is validated once up front, after which every record can be
/// decoded on demand, either sequentially or by index.
#[derive(Debug)]
pub struct HistoryReader {
    data: Vec<u8>,
}

impl HistoryReader {
    pub fn new(data: Vec<u8>) -> Result<Self, HistoryError> {
        if data.len() % RECORD_WIDTH != 0 {
            return Err(HistoryError::MalformedStream { len: data.len() });
        }

        Ok(Self { data })
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        debug!("read {} bytes of history from {}", data.len(), path.display());

        Self::new(data)
    }

    /// Number of records in the history.
    pub fn len(&self) -> usize {
        self.data.len() / RECORD_WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Decodes the record at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<PixelRecord> {
        let start = index.checked_mul(RECORD_WIDTH)?;
        let bytes = self.data.get(start..start.checked_add(RECORD_WIDTH)?)?;

        // A full record slice always decodes: every field is fixed width
        let (record, _) = bincode::decode_from_slice(bytes, record_config()).ok()?;
        Some(record)
    }

    pub fn iter(&self) -> Records<'_> {
        self.iter_from(0)
    }

    /// Iterates from `index` onwards without decoding anything before it.
    pub fn iter_from(&self, index: usize) -> Records<'_> {
        Records {
            reader: self,
            position: index.min(self.len()),
        }
    }
}

impl<'a> IntoIterator for &'a HistoryReader {
    type Item = PixelRecord;
    type IntoIter = Records<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Records<'a> {
    reader: &'a HistoryReader,
    position: usize,
}

impl Records<'_> {
    /// Index of the record the next call to `next` returns.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Iterator for Records<'_> {
    type Item = PixelRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.reader.get(self.position)?;
        self.position += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reader.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Records<'_> {}

impl FusedIterator for Records<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_bytes(x: u32, y: u32, color: [u8; 4], player: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&x.to_be_bytes());
        bytes.extend_from_slice(&y.to_be_bytes());
        bytes.extend_from_slice(&color);
        bytes.extend_from_slice(&player.to_be_bytes());
        bytes
    }

    #[test]
    fn decodes_big_endian_layout() {
        let data = record_bytes(0x0102_0304, 7, [200, 100, 50, 255], 0x00ab_cdef);
        let reader = HistoryReader::new(data).unwrap();

        assert_eq!(reader.len(), 1);
        assert_eq!(
            reader.get(0),
            Some(PixelRecord::new(0x0102_0304, 7, [200, 100, 50, 255], 0x00ab_cdef))
        );
    }

    #[test]
    fn color_bytes_are_not_swapped() {
        let data = vec![0, 0, 0, 1, 0, 0, 0, 2, 10, 20, 30, 40, 0, 0, 0, 3];
        let reader = HistoryReader::new(data).unwrap();

        let record = reader.get(0).unwrap();
        assert_eq!(record.color, [10, 20, 30, 40]);
        assert_eq!((record.x, record.y, record.player_index), (1, 2, 3));
    }

    #[test]
    fn rejects_partial_records() {
        let mut data = record_bytes(1, 1, [0, 0, 0, 255], 0);
        data.push(0);

        match HistoryReader::new(data) {
            Err(HistoryError::MalformedStream { len }) => assert_eq!(len, 17),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("17 bytes should not decode"),
        }
    }

    #[test]
    fn empty_history_is_valid() {
        let reader = HistoryReader::new(Vec::new()).unwrap();

        assert!(reader.is_empty());
        assert_eq!(reader.iter().count(), 0);
        assert_eq!(reader.get(0), None);
    }

    #[test]
    fn record_count_follows_length() {
        let data: Vec<u8> = (0..25u32)
            .flat_map(|i| record_bytes(i, i * 2, [i as u8, 0, 0, 255], i % 4))
            .collect();
        let reader = HistoryReader::new(data).unwrap();

        assert_eq!(reader.len(), reader.byte_len() / RECORD_WIDTH);
        assert_eq!(reader.iter().len(), 25);
        assert_eq!(reader.iter().count(), 25);
    }

    #[test]
    fn iteration_is_restartable() {
        let data: Vec<u8> = (0..10u32)
            .flat_map(|i| record_bytes(i, 9 - i, [1, 2, 3, 4], i))
            .collect();
        let reader = HistoryReader::new(data).unwrap();

        let first: Vec<_> = reader.iter().collect();
        let second: Vec<_> = (&reader).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn resumes_from_any_index() {
        let data: Vec<u8> = (0..10u32)
            .flat_map(|i| record_bytes(i, i, [0, 0, 0, 255], i))
            .collect();
        let reader = HistoryReader::new(data).unwrap();

        let resumed: Vec<_> = reader.iter_from(4).collect();
        let skipped: Vec<_> = reader.iter().skip(4).collect();
        assert_eq!(resumed, skipped);

        let mut records = reader.iter_from(8);
        assert_eq!(records.position(), 8);
        records.next();
        assert_eq!(records.position(), 9);
        assert_eq!(reader.iter_from(50).count(), 0);
    }
}
