use std::{collections::HashMap, io::Write};

use chrono::NaiveDateTime;
use log::debug;
use structures::{PixelRecord, Rgba};

use crate::{constants::record_config, errors::HistoryError, roster::Roster};

/// Streams records into the 16-byte history format.
pub struct HistoryWriter<W: Write> {
    dest: W,
    num_records: usize,
}

impl<W: Write> HistoryWriter<W> {
    pub fn new(dest: W) -> Self {
        HistoryWriter {
            dest,
            num_records: 0,
        }
    }

    pub fn add_record(&mut self, record: &PixelRecord) -> Result<(), HistoryError> {
        bincode::encode_into_std_write(*record, &mut self.dest, record_config())
            .map_err(|err| HistoryError::Encode(format!("{:?}", err)))?;
        self.num_records += 1;

        Ok(())
    }

    pub fn num_records(&self) -> usize {
        self.num_records
    }

    pub fn finish(mut self) -> Result<W, HistoryError> {
        self.dest.flush()?;
        Ok(self.dest)
    }
}

pub fn encode_records(records: &[PixelRecord]) -> Result<Vec<u8>, HistoryError> {
    let mut writer = HistoryWriter::new(Vec::new());
    for record in records {
        writer.add_record(record)?;
    }

    writer.finish()
}

#[derive(Debug)]
struct IntermediatePlacement {
    x: u32,
    y: u32,
    color: Rgba,
    player_index: u32,
    placed_at: NaiveDateTime,
}

/// Collects placements from a raw log and writes them out in placement order.
///
/// Player addresses are numbered in the order they are first seen; the
/// resulting [`Roster`] is what the history's player indices refer to.
pub struct HistoryPacker {
    address_to_index: HashMap<String, u32>,
    addresses: Vec<String>,
    placements: Vec<IntermediatePlacement>,
}

impl HistoryPacker {
    pub fn new() -> Self {
        HistoryPacker {
            address_to_index: HashMap::new(),
            addresses: Vec::new(),
            placements: Vec::new(),
        }
    }

    pub fn add_placement(
        &mut self,
        x: u32,
        y: u32,
        color: Rgba,
        address: &str,
        placed_at: NaiveDateTime,
    ) {
        let next_index = self.addresses.len() as u32;
        let player_index = match self.address_to_index.get(address) {
            Some(index) => *index,
            None => {
                self.address_to_index.insert(address.to_string(), next_index);
                self.addresses.push(address.to_string());
                next_index
            }
        };

        self.placements.push(IntermediatePlacement {
            x,
            y,
            color,
            player_index,
            placed_at,
        });
    }

    pub fn num_placements(&self) -> usize {
        self.placements.len()
    }

    /// Writes every placement sorted by time. Placements sharing a timestamp
    /// keep the order they were added in.
    pub fn finalize<W: Write>(mut self, dest: W) -> Result<(W, Roster), HistoryError> {
        self.placements.sort_by_key(|placement| placement.placed_at);

        let mut writer = HistoryWriter::new(dest);
        for placement in &self.placements {
            writer.add_record(&PixelRecord::new(
                placement.x,
                placement.y,
                placement.color,
                placement.player_index,
            ))?;
        }

        debug!(
            "packed {} placements from {} players",
            writer.num_records(),
            self.addresses.len()
        );

        Ok((writer.finish()?, Roster::new(self.addresses)))
    }
}

impl Default for HistoryPacker {
    fn default() -> Self {
        Self::new()
    }
}
